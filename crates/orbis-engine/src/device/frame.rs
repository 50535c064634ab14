/// One acquired surface texture.
///
/// Hold it only for the duration of a frame: the surface hands out no new
/// texture until this one is presented or dropped.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl GpuFrame {
    /// Size of the surface texture in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        let texture = &self.surface_texture.texture;
        (texture.width(), texture.height())
    }
}
