//! The compute kernel: pipeline, named resource slots, dispatch.
//!
//! The kernel body is opaque to this crate. It is expected to declare:
//!
//! ```wgsl
//! struct Triangle { v0: array<f32, 3>, v1: array<f32, 3>, v2: array<f32, 3> }
//! struct Params { pos: vec3<f32>, forward: vec3<f32>, up: vec3<f32>, right: vec3<f32>,
//!                 screenSize: vec2<f32>, fov: f32 }
//!
//! @group(0) @binding(0) var Result: texture_storage_2d<rgba16float, write>;
//! @group(0) @binding(1) var<storage, read> triangles: array<Triangle>;
//! @group(0) @binding(2) var<uniform> params: Params;
//!
//! @compute @workgroup_size(8, 8, 1)
//! fn CSMain(@builtin(global_invocation_id) id: vec3<u32>) { ... }
//! ```

use std::borrow::Cow;

use crate::camera::KernelUniforms;
use crate::error::ResourceError;
use crate::target::RenderTarget;

/// Output image slot.
pub const SLOT_RESULT: &str = "Result";
/// Triangle soup slot.
pub const SLOT_TRIANGLES: &str = "triangles";
/// Camera/resolution uniform slot.
pub const SLOT_PARAMS: &str = "params";

const SLOTS: [(&str, u32); 3] = [(SLOT_RESULT, 0), (SLOT_TRIANGLES, 1), (SLOT_PARAMS, 2)];

/// Resolves a resource slot name to its binding index in group 0.
pub fn slot(name: &str) -> Result<u32, ResourceError> {
    SLOTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, binding)| binding)
        .ok_or_else(|| ResourceError::UnknownSlot(name.to_string()))
}

/// WGSL source of a kernel honoring the slot contract above.
#[derive(Debug, Clone)]
pub struct KernelSource {
    pub label: Cow<'static, str>,
    pub wgsl: Cow<'static, str>,
}

impl KernelSource {
    pub fn wgsl(label: impl Into<Cow<'static, str>>, wgsl: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            wgsl: wgsl.into(),
        }
    }
}

/// Resources bound to the kernel's slots, by name.
pub struct KernelBindings<'a> {
    pub result: &'a wgpu::TextureView,
    pub triangles: &'a wgpu::Buffer,
    pub params: &'a wgpu::Buffer,
}

impl KernelBindings<'_> {
    fn resource(&self, name: &str) -> Result<wgpu::BindingResource<'_>, ResourceError> {
        Ok(match name {
            SLOT_RESULT => wgpu::BindingResource::TextureView(self.result),
            SLOT_TRIANGLES => self.triangles.as_entire_binding(),
            SLOT_PARAMS => self.params.as_entire_binding(),
            other => return Err(ResourceError::UnknownSlot(other.to_string())),
        })
    }
}

/// Compiled compute pipeline plus its bind group layout.
pub struct Kernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    label: String,
}

impl Kernel {
    /// Compiles `source` and builds the compute pipeline for `entry_point`.
    ///
    /// WGSL errors and a missing entry point are caught in a validation error scope
    /// and returned as [`ResourceError::KernelCompile`].
    pub fn new(
        device: &wgpu::Device,
        source: &KernelSource,
        entry_point: &str,
    ) -> Result<Self, ResourceError> {
        let label = format!("{} kernel", source.label);
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.wgsl.clone()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} bgl")),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: SLOTS[0].1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: RenderTarget::FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SLOTS[1].1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SLOTS[2].1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(KernelUniforms::SIZE),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} pipeline layout")),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            log::error!("{label} failed to compile (entry {entry_point}): {err}");
            return Err(ResourceError::KernelCompile(err.to_string()));
        }

        log::debug!("compiled {label} (entry {entry_point})");

        Ok(Self {
            pipeline,
            bind_group_layout,
            label,
        })
    }

    /// Builds the bind group, resolving every slot through [`slot`].
    pub fn bind(
        &self,
        device: &wgpu::Device,
        bindings: &KernelBindings<'_>,
    ) -> Result<wgpu::BindGroup, ResourceError> {
        let mut entries = Vec::with_capacity(SLOTS.len());
        for name in [SLOT_RESULT, SLOT_TRIANGLES, SLOT_PARAMS] {
            entries.push(wgpu::BindGroupEntry {
                binding: slot(name)?,
                resource: bindings.resource(name)?,
            });
        }

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} bind group", self.label)),
            layout: &self.bind_group_layout,
            entries: &entries,
        }))
    }

    /// Records one compute pass launching `grid` thread groups.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        grid: [u32; 3],
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&self.label),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(grid[0], grid[1], grid[2]);
    }
}
