//! WGSL shaders for point rendering

/// Point splat shader.
///
/// Each point is one instance; the six vertices of its screen-aligned quad
/// are generated from `vertex_index`, so no per-corner vertex data exists.
/// `point_size` is the quad's edge length in pixels.
pub const POINT_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    viewport: vec2<f32>,
    point_size: f32,
    _padding: f32,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct InstanceInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

var<private> CORNERS: array<vec2<f32>, 6> = array<vec2<f32>, 6>(
    vec2<f32>(-1.0, -1.0),
    vec2<f32>(1.0, -1.0),
    vec2<f32>(1.0, 1.0),
    vec2<f32>(-1.0, -1.0),
    vec2<f32>(1.0, 1.0),
    vec2<f32>(-1.0, 1.0),
);

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32, instance: InstanceInput) -> VertexOutput {
    var out: VertexOutput;
    let center = uniforms.view_proj * vec4<f32>(instance.position, 1.0);
    let offset = CORNERS[vertex_index] * uniforms.point_size / uniforms.viewport;
    out.clip_position = vec4<f32>(center.xy + offset * center.w, center.z, center.w);
    out.color = instance.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#;

/// Vertices emitted per point instance
pub const VERTICES_PER_POINT: u32 = 6;

/// Entry points in [`POINT_SHADER`]
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";
