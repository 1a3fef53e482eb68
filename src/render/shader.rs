//! WGSL programs for the geometry, post-processing and blit passes.
//!
//! The struct blocks below are the device half of the shared layout
//! contract in [`crate::shader_types`]; the two sides must agree field for
//! field. `ProjectedVertex.position` carries the positional builtin, every
//! other field is interpolated before `basic_fragment` reads it.

pub(crate) const GEOMETRY: &str = r#"
struct ViewProjection {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
}

struct ModelTransformation {
    translation: mat4x4<f32>,
    rotation: mat4x4<f32>,
    scaling: mat4x4<f32>,
}

struct FragmentParams {
    camera_position: vec3<f32>,
    specular_coefficient: f32,
    num_directional_lights: i32,
    num_point_lights: i32,
    texturing: u32,
    _pad: u32,
}

struct DirectionalLight {
    direction: vec3<f32>,
    color: vec3<f32>,
    intensity: f32,
}

struct PointLight {
    position: vec3<f32>,
    color: vec3<f32>,
    intensity: f32,
    radius: f32,
}

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) uvs: vec2<f32>,
}

struct ProjectedVertex {
    @builtin(position) position: vec4<f32>,
    @location(0) world_position: vec4<f32>,
    @location(1) color: vec4<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) world_normal: vec3<f32>,
    @location(4) uvs: vec2<f32>,
}

@group(0) @binding(0)
var<uniform> camera: ViewProjection;

@group(0) @binding(1)
var<uniform> params: FragmentParams;

@group(0) @binding(2)
var<storage, read> directional_lights: array<DirectionalLight>;

@group(0) @binding(3)
var<storage, read> point_lights: array<PointLight>;

@group(1) @binding(0)
var<uniform> object: ModelTransformation;

@vertex
fn project_vertex(input: VertexInput) -> ProjectedVertex {
    var out: ProjectedVertex;
    let model = object.translation * object.rotation * object.scaling;
    let world_position = model * vec4<f32>(input.position, 1.0);
    out.position = camera.projection * camera.view * world_position;
    out.world_position = world_position;
    out.color = input.color;

    let world_normal = normalize((object.rotation * vec4<f32>(input.normal, 0.0)).xyz);
    out.world_normal = world_normal;
    out.normal = normalize((camera.view * vec4<f32>(world_normal, 0.0)).xyz);
    out.uvs = input.uvs;
    return out;
}

const AMBIENT: f32 = 0.15;
const SHININESS: f32 = 32.0;

fn light_contribution(
    base: vec3<f32>,
    normal: vec3<f32>,
    view_direction: vec3<f32>,
    to_light: vec3<f32>,
    color: vec3<f32>,
    intensity: f32,
) -> vec3<f32> {
    let diffuse = max(dot(normal, to_light), 0.0);
    let halfway = normalize(to_light + view_direction);
    let specular = pow(max(dot(normal, halfway), 0.0), SHININESS) * params.specular_coefficient;
    return (base * diffuse + vec3<f32>(specular)) * color * intensity;
}

@fragment
fn basic_fragment(input: ProjectedVertex) -> @location(0) vec4<f32> {
    var base = input.color.rgb;
    if (params.texturing != 0u) {
        let checker = (u32(floor(input.uvs.x * 8.0)) + u32(floor(input.uvs.y * 8.0))) % 2u;
        base = base * mix(0.72, 1.0, f32(checker));
    }

    let normal = normalize(input.world_normal);
    let view_direction = normalize(params.camera_position - input.world_position.xyz);
    var total = base * AMBIENT;

    for (var i = 0; i < params.num_directional_lights; i++) {
        let light = directional_lights[i];
        total += light_contribution(
            base,
            normal,
            view_direction,
            -normalize(light.direction),
            light.color,
            light.intensity,
        );
    }

    for (var i = 0; i < params.num_point_lights; i++) {
        let light = point_lights[i];
        let offset = light.position - input.world_position.xyz;
        let distance = length(offset);
        if (distance < light.radius && distance > 1e-6) {
            let attenuation = 1.0 - distance / light.radius;
            total += light_contribution(
                base,
                normal,
                view_direction,
                offset / distance,
                light.color,
                light.intensity * attenuation,
            );
        }
    }

    return vec4<f32>(total, input.color.a);
}
"#;

pub(crate) const POST: &str = r#"
struct KernelParams {
    size: i32,
    _pad0: i32,
    _pad1: i32,
    _pad2: i32,
}

@group(0) @binding(0)
var src: texture_2d<f32>;

@group(0) @binding(1)
var dst: texture_storage_2d<rgba8unorm, write>;

@group(0) @binding(2)
var<storage, read> weights: array<f32>;

@group(0) @binding(3)
var<uniform> kernel: KernelParams;

@compute @workgroup_size(8, 8, 1)
fn apply_kernel(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(src);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }

    let half = kernel.size / 2;
    var total = vec3<f32>(0.0);
    var weight_sum = 0.0;
    for (var row = 0; row < kernel.size; row++) {
        for (var col = 0; col < kernel.size; col++) {
            let weight = weights[row * kernel.size + col];
            let x = clamp(i32(gid.x) + col - half, 0, i32(dims.x) - 1);
            let y = clamp(i32(gid.y) + row - half, 0, i32(dims.y) - 1);
            total += textureLoad(src, vec2<i32>(x, y), 0).rgb * weight;
            weight_sum += weight;
        }
    }
    if (abs(weight_sum) < 1e-6) {
        weight_sum = 1.0;
    }

    let alpha = textureLoad(src, vec2<i32>(gid.xy), 0).a;
    textureStore(dst, vec2<i32>(gid.xy), vec4<f32>(total / weight_sum, alpha));
}

@compute @workgroup_size(8, 8, 1)
fn invert_color(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(src);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let texel = textureLoad(src, vec2<i32>(gid.xy), 0);
    textureStore(dst, vec2<i32>(gid.xy), vec4<f32>(vec3<f32>(1.0) - texel.rgb, texel.a));
}
"#;

pub(crate) const BLIT: &str = r#"
struct BlitOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uvs: vec2<f32>,
}

@vertex
fn fullscreen_vertex(@builtin(vertex_index) index: u32) -> BlitOutput {
    var out: BlitOutput;
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uvs = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@group(0) @binding(0)
var blit_source: texture_2d<f32>;

@group(0) @binding(1)
var blit_sampler: sampler;

@fragment
fn blit_fragment(input: BlitOutput) -> @location(0) vec4<f32> {
    return textureSample(blit_source, blit_sampler, input.uvs);
}
"#;
