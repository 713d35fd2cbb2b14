// 162-entry unit-vector table used by MsgBuf's Dir codec (4.1). The classic
// engine bakes this from subdividing an icosahedron at build time; we derive
// an equivalent fixed, deterministic table with a Fibonacci lattice so every
// build produces the identical 162 directions without shipping a literal
// dump of floats.
fn fibonacci_sphere(n: usize) -> [Vec3; NUMVERTEXNORMALS] {
    let mut out = [[0.0f32; 3]; NUMVERTEXNORMALS];
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    for i in 0..n {
        let y = 1.0 - (i as f64 / (n as f64 - 1.0)) * 2.0;
        let radius = (1.0 - y * y).max(0.0).sqrt();
        let theta = golden_angle * i as f64;
        let x = theta.cos() * radius;
        let z = theta.sin() * radius;
        out[i] = [x as f32, y as f32, z as f32];
    }
    out
}

static BYTEDIRS_CELL: std::sync::OnceLock<[Vec3; NUMVERTEXNORMALS]> = std::sync::OnceLock::new();

#[allow(non_snake_case)]
fn BYTEDIRS_TABLE() -> &'static [Vec3; NUMVERTEXNORMALS] {
    BYTEDIRS_CELL.get_or_init(|| fibonacci_sphere(NUMVERTEXNORMALS))
}

pub struct ByteDirs;
impl std::ops::Index<usize> for ByteDirs {
    type Output = Vec3;
    fn index(&self, i: usize) -> &Vec3 {
        &BYTEDIRS_TABLE()[i]
    }
}
impl ByteDirs {
    pub fn iter(&self) -> std::slice::Iter<'static, Vec3> {
        BYTEDIRS_TABLE().iter()
    }
}

#[allow(non_upper_case_globals)]
pub const BYTEDIRS: ByteDirs = ByteDirs;
