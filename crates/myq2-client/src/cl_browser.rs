// cl_browser.rs -- server browser (R1Q2/Q2Pro feature)
//
// Master server queries, LAN discovery and server list management are
// a UI/networking collaborator out of scope here; this keeps the
// filter/sort types and the call surface the console commands use,
// with no actual querying.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};

use myq2_common::common::com_printf;

/// Sort column for server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    Name,
    Map,
    Players,
    #[default]
    Ping,
    GameType,
}

/// Server filter configuration.
#[derive(Clone, Default)]
pub struct ServerFilter {
    pub name_contains: String,
    pub map_contains: String,
    pub gametype: String,
    pub not_empty: bool,
    pub not_full: bool,
    pub max_ping: i32,
}

impl ServerFilter {
    pub fn matches(&self, server: &ServerEntry) -> bool {
        if !self.name_contains.is_empty()
            && !server.name.to_lowercase().contains(&self.name_contains.to_lowercase())
        {
            return false;
        }
        if !self.map_contains.is_empty()
            && !server.map.to_lowercase().contains(&self.map_contains.to_lowercase())
        {
            return false;
        }
        if self.not_empty && server.players == 0 {
            return false;
        }
        if self.not_full && server.players >= server.max_players {
            return false;
        }
        if self.max_ping > 0 && server.ping > self.max_ping {
            return false;
        }
        true
    }
}

/// A server entry in the browser list.
#[derive(Clone, Default)]
pub struct ServerEntry {
    pub address: String,
    pub name: String,
    pub map: String,
    pub players: i32,
    pub max_players: i32,
    pub ping: i32,
    pub is_favorite: bool,
}

/// Server browser state. No actual querying: servers never populate.
#[derive(Default)]
pub struct ServerBrowser {
    pub servers: Vec<ServerEntry>,
    pub favorites: HashSet<String>,
    pub filter: ServerFilter,
    pub sort_column: SortColumn,
    pub sort_ascending: bool,
}

impl ServerBrowser {
    pub fn sort(&mut self) {
        let ascending = self.sort_ascending;
        match self.sort_column {
            SortColumn::Name => self.servers.sort_by(|a, b| {
                let cmp = a.name.to_lowercase().cmp(&b.name.to_lowercase());
                if ascending { cmp } else { cmp.reverse() }
            }),
            SortColumn::Map => self.servers.sort_by(|a, b| {
                let cmp = a.map.to_lowercase().cmp(&b.map.to_lowercase());
                if ascending { cmp } else { cmp.reverse() }
            }),
            SortColumn::Players => self.servers.sort_by(|a, b| {
                let cmp = a.players.cmp(&b.players);
                if ascending { cmp } else { cmp.reverse() }
            }),
            SortColumn::Ping => self.servers.sort_by(|a, b| {
                let cmp = a.ping.cmp(&b.ping);
                if ascending { cmp } else { cmp.reverse() }
            }),
            SortColumn::GameType => {}
        }
    }

    pub fn get_filtered_servers(&self) -> Vec<&ServerEntry> {
        self.servers.iter().filter(|s| self.filter.matches(s)).collect()
    }

    pub fn add_favorite(&mut self, address: &str) {
        self.favorites.insert(address.to_string());
    }

    pub fn remove_favorite(&mut self, address: &str) {
        self.favorites.remove(address);
    }

    pub fn clear(&mut self) {
        self.servers.clear();
    }
}

/// Global server browser instance.
pub static BROWSER: LazyLock<Mutex<ServerBrowser>> =
    LazyLock::new(|| Mutex::new(ServerBrowser::default()));

// ============================================================
// Public API
// ============================================================

/// Initialize the server browser. No-op: querying is not supported.
pub fn browser_init() {}

/// Refresh the server list. No-op: querying is not supported.
pub fn browser_refresh() {
    com_printf("Server browser is not supported.\n");
}

/// Process incoming server responses. No-op: querying is not supported.
pub fn browser_update() {}

/// Add a server manually. No-op: querying is not supported.
pub fn browser_add_server(_address: &str) {}

/// Toggle favorite status for a server address.
pub fn browser_toggle_favorite(address: &str) {
    let mut browser = BROWSER.lock().unwrap();
    if browser.favorites.contains(address) {
        browser.remove_favorite(address);
        com_printf(&format!("Removed {} from favorites.\n", address));
    } else {
        browser.add_favorite(address);
        com_printf(&format!("Added {} to favorites.\n", address));
    }
}

/// Set sort column.
pub fn browser_set_sort(column: SortColumn, ascending: bool) {
    let mut browser = BROWSER.lock().unwrap();
    browser.sort_column = column;
    browser.sort_ascending = ascending;
    browser.sort();
}

/// Print browser info.
pub fn cmd_browser_info() {
    let browser = BROWSER.lock().unwrap();
    com_printf(&format!(
        "Server Browser Info:\n Total servers: {}\n Favorites: {}\n",
        browser.servers.len(),
        browser.favorites.len(),
    ));
}

/// Print server list.
pub fn cmd_serverlist() {
    let browser = BROWSER.lock().unwrap();
    let filtered = browser.get_filtered_servers();
    if filtered.is_empty() {
        com_printf("No servers found. Server browsing is not supported.\n");
        return;
    }
    com_printf(&format!("--- Server List ({} servers) ---\n", filtered.len()));
}

/// Clear server list.
pub fn cmd_browser_clear() {
    let mut browser = BROWSER.lock().unwrap();
    browser.clear();
    com_printf("Server list cleared.\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_filter() {
        let filter = ServerFilter {
            not_empty: true,
            max_ping: 100,
            ..Default::default()
        };

        let mut server = ServerEntry { players: 0, ping: 50, ..Default::default() };
        assert!(!filter.matches(&server));

        server.players = 4;
        assert!(filter.matches(&server));

        server.ping = 200;
        assert!(!filter.matches(&server));
    }

    #[test]
    fn test_server_sort() {
        let mut browser = ServerBrowser::default();
        browser.servers.push(ServerEntry { name: "Server A".to_string(), ping: 50, ..Default::default() });
        browser.servers.push(ServerEntry { name: "Server B".to_string(), ping: 25, ..Default::default() });

        browser.sort_column = SortColumn::Ping;
        browser.sort_ascending = true;
        browser.sort();

        assert_eq!(browser.servers[0].name, "Server B");
    }

    #[test]
    fn test_favorites() {
        let mut browser = ServerBrowser::default();
        browser.add_favorite("127.0.0.1:27910");
        assert!(browser.favorites.contains("127.0.0.1:27910"));
        browser.remove_favorite("127.0.0.1:27910");
        assert!(!browser.favorites.contains("127.0.0.1:27910"));
    }
}
