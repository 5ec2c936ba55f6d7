use std::collections::BTreeSet;

use crate::device::BackendError;

use super::framebuffer::{required_targets, DEPTH_BUFFER_FORMAT, TARGET_FORMATS};
use super::geometry::vertex_layout;
use super::RenderCtx;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Bind group 0 layout every program must use:
/// `0` uniform (vertex), `1` 2D float texture (fragment), `2` filtering sampler (fragment).
const BINDINGS: [u32; 3] = [0, 1, 2];

/// Vertex inputs supplied by the geometry buffer.
const VERTEX_INPUTS: [u32; 2] = [0, 1];

/// WGSL source for one vertex/fragment program pair.
#[derive(Debug, Copy, Clone)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// Compiled and linked render pipeline targeting the multi-target framebuffer.
pub struct Program {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl Program {
    /// Compiles both stages, checks their interfaces match and that the device can
    /// render every target format, then builds the pipeline.
    ///
    /// Shader, interface and format failures are reported before any wgpu object
    /// is created. Anything wgpu still rejects comes back as `ProgramLink`.
    pub fn compile(ctx: &RenderCtx<'_>, src: &ProgramSource<'_>) -> Result<Self, BackendError> {
        let vs = parse_and_validate("vertex", src.vertex)?;
        let fs = parse_and_validate("fragment", src.fragment)?;
        link(&vs, &fs)?;

        let targets = required_targets();
        targets.check_limits(&ctx.device.limits())?;
        targets.check_adapter(ctx.adapter)?;

        let (pipeline, bind_group_layout) = ctx.validated(BackendError::ProgramLink, || {
            let vs_module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{} vs", src.label)),
                source: wgpu::ShaderSource::Wgsl(src.vertex.into()),
            });
            let fs_module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{} fs", src.label)),
                source: wgpu::ShaderSource::Wgsl(src.fragment.into()),
            });

            let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("refocal program bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

            let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("refocal program pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

            let color_targets = TARGET_FORMATS.map(|format| {
                Some(wgpu::ColorTargetState { format, blend: None, write_mask: wgpu::ColorWrites::ALL })
            });

            let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(src.label),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &vs_module,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &[vertex_layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &fs_module,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &color_targets,
                }),

                // The mesh is single-sided but viewed from arbitrary cameras: no culling.
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_BUFFER_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),

                multiview_mask: None,
                cache: None,
            });
            (pipeline, bind_group_layout)
        })?;

        log::debug!("program '{}' compiled", src.label);
        Ok(Self { pipeline, bind_group_layout })
    }

    #[inline]
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    #[inline]
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

/// Size of the binding-0 uniform: one column-major `mat4x4<f32>`.
pub const UNIFORM_SIZE: u64 = 64;

// ── compile ───────────────────────────────────────────────────────────────

fn parse_and_validate(stage: &'static str, src: &str) -> Result<naga::Module, BackendError> {
    let module = naga::front::wgsl::parse_str(src)
        .map_err(|e| BackendError::ShaderCompile { stage, log: e.emit_to_string(src) })?;

    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::empty())
        .validate(&module)
        .map_err(|e| BackendError::ShaderCompile { stage, log: error_chain(&e) })?;

    Ok(module)
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

// ── link ──────────────────────────────────────────────────────────────────

/// Checks entry points, bindings and the stage interface.
fn link(vs: &naga::Module, fs: &naga::Module) -> Result<(), BackendError> {
    let vs_ep = find_entry(vs, VERTEX_ENTRY, naga::ShaderStage::Vertex)?;
    let fs_ep = find_entry(fs, FRAGMENT_ENTRY, naga::ShaderStage::Fragment)?;

    check_bindings(vs, "vertex")?;
    check_bindings(fs, "fragment")?;

    let mut vs_inputs = BTreeSet::new();
    for arg in &vs_ep.function.arguments {
        collect_locations(vs, arg.ty, arg.binding.as_ref(), &mut vs_inputs);
    }
    if let Some(&loc) = vs_inputs.iter().find(|l| !VERTEX_INPUTS.contains(l)) {
        return Err(BackendError::ProgramLink(format!(
            "vertex input @location({loc}) is not provided by the geometry buffer"
        )));
    }

    let mut vs_outputs = BTreeSet::new();
    if let Some(result) = &vs_ep.function.result {
        collect_locations(vs, result.ty, result.binding.as_ref(), &mut vs_outputs);
    }
    let mut fs_inputs = BTreeSet::new();
    for arg in &fs_ep.function.arguments {
        collect_locations(fs, arg.ty, arg.binding.as_ref(), &mut fs_inputs);
    }
    if let Some(loc) = fs_inputs.difference(&vs_outputs).next() {
        return Err(BackendError::ProgramLink(format!(
            "fragment input @location({loc}) is not written by the vertex stage"
        )));
    }

    let mut fs_outputs = BTreeSet::new();
    if let Some(result) = &fs_ep.function.result {
        collect_locations(fs, result.ty, result.binding.as_ref(), &mut fs_outputs);
    }
    if let Some(&loc) = fs_outputs.iter().find(|&&l| l as usize >= TARGET_FORMATS.len()) {
        return Err(BackendError::ProgramLink(format!(
            "fragment output @location({loc}) has no color attachment ({} available)",
            TARGET_FORMATS.len()
        )));
    }
    Ok(())
}

fn find_entry<'m>(
    module: &'m naga::Module,
    name: &str,
    stage: naga::ShaderStage,
) -> Result<&'m naga::EntryPoint, BackendError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name && ep.stage == stage)
        .ok_or_else(|| BackendError::ProgramLink(format!("missing {stage:?} entry point '{name}'")))
}

fn check_bindings(module: &naga::Module, stage: &str) -> Result<(), BackendError> {
    for (_, var) in module.global_variables.iter() {
        if let Some(rb) = &var.binding {
            if rb.group != 0 || !BINDINGS.contains(&rb.binding) {
                return Err(BackendError::ProgramLink(format!(
                    "{stage} stage uses @group({}) @binding({}), outside the program layout",
                    rb.group, rb.binding
                )));
            }
        }
    }
    Ok(())
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut BTreeSet<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location);
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    if let Some(naga::Binding::Location { location, .. }) = &m.binding {
                        out.insert(*location);
                    }
                }
            }
        }
    }
}
