/// Counters for one rendered frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameInfo {
    pub frame: u64,
    pub draw_calls: u32,
    pub triangles: u64,
    pub lines: u64,
    pub points: u64,
    /// Items in the render list after culling.
    pub items: usize,
    pub culled: u32,
    /// Items dropped because of missing data or failed uploads/compiles.
    pub skipped: u32,
    pub transmission_pass: bool,
}

/// Live totals for a renderer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RendererInfo {
    pub frames: u64,
    pub programs: usize,
    /// Compile attempts since construction, failures included.
    pub compiles: usize,
    pub geometries: usize,
    pub textures: usize,
    /// Backend state calls issued by the state tracker.
    pub state_changes: u64,
    pub last_frame: FrameInfo,
}
