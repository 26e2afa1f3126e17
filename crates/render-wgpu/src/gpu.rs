use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::collections::HashMap;
use viewloop_common::NodeId;
use viewloop_render::PerspectiveCamera;
use viewloop_scene::{LineGeometry, MeshGeometry, NodeKind, Scene};
use wgpu::util::DeviceExt;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    /// Direction toward the light, world space.
    light_dir: [f32; 4],
    /// Light color premultiplied by intensity.
    light_color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct MeshInstance {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
    specular: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct LineInstance {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
}

/// Per-frame draw list gathered from the scene.
#[derive(Debug, Default)]
struct FrameDraws {
    meshes: Vec<(NodeId, MeshInstance)>,
    lines: Vec<(NodeId, LineInstance)>,
}

fn frame_uniforms(scene: &Scene, camera: &PerspectiveCamera) -> Uniforms {
    let (light_dir, light_color) = match scene.directional_lights().first() {
        Some((light, position)) => (
            position.normalize_or_zero(),
            light.radiance().to_vec3(),
        ),
        None => (Vec3::Y, Vec3::ZERO),
    };
    Uniforms {
        view_proj: camera.view_projection().to_cols_array_2d(),
        camera_pos: camera.position.extend(1.0).to_array(),
        light_dir: light_dir.extend(0.0).to_array(),
        light_color: light_color.extend(1.0).to_array(),
    }
}

fn collect_draws(scene: &Scene) -> FrameDraws {
    let mut draws = FrameDraws::default();
    scene.visit(|id, node, world: Mat4| {
        let [model_0, model_1, model_2, model_3] = world.to_cols_array_2d();
        match &node.kind {
            NodeKind::Mesh { material, .. } => {
                let mut specular = material.specular.to_rgba(0.0);
                specular[3] = material.shininess.max(1.0);
                draws.meshes.push((
                    id,
                    MeshInstance {
                        model_0,
                        model_1,
                        model_2,
                        model_3,
                        color: material.color.to_rgba(1.0),
                        specular,
                    },
                ));
            }
            NodeKind::LineSegments { material, .. } => {
                draws.lines.push((
                    id,
                    LineInstance {
                        model_0,
                        model_1,
                        model_2,
                        model_3,
                        color: material.color.to_rgba(1.0),
                    },
                ));
            }
            NodeKind::Group | NodeKind::DirectionalLight(_) => {}
        }
    });
    draws
}

/// Vertex (and optional index) buffer for one node's geometry.
struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    count: u32,
}

fn upload_mesh(device: &wgpu::Device, mesh: &MeshGeometry) -> GpuGeometry {
    let vertices: Vec<Vertex> = mesh
        .positions
        .iter()
        .zip(&mesh.normals)
        .map(|(p, n)| Vertex {
            position: p.to_array(),
            normal: n.to_array(),
        })
        .collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh_vertex_buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh_index_buffer"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuGeometry {
        vertex_buffer,
        index_buffer: Some(index_buffer),
        count: mesh.indices.len() as u32,
    }
}

fn upload_lines(device: &wgpu::Device, lines: &LineGeometry) -> GpuGeometry {
    let points: Vec<[f32; 3]> = lines.points.iter().map(|p| p.to_array()).collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("line_vertex_buffer"),
        contents: bytemuck::cast_slice(&points),
        usage: wgpu::BufferUsages::VERTEX,
    });
    GpuGeometry {
        vertex_buffer,
        index_buffer: None,
        count: points.len() as u32,
    }
}

/// Growable instance buffer.
struct InstanceBuffer {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl InstanceBuffer {
    fn new(device: &wgpu::Device, label: &'static str, capacity: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            label,
            buffer,
            capacity,
        }
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let needed = bytes.len() as u64;
        if needed > self.capacity {
            tracing::debug!(label = self.label, needed, "growing instance buffer");
            *self = Self::new(device, self.label, needed.next_power_of_two());
        }
        queue.write_buffer(&self.buffer, 0, bytes);
    }
}

/// Mesh and line pipelines plus the GPU copies of scene geometry.
///
/// Geometry is uploaded the first time a node is drawn and kept for the life
/// of the renderer; scenes only grow, so the cache never needs eviction.
pub struct ScenePipelines {
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    geometry: HashMap<NodeId, GpuGeometry>,
    mesh_instances: InstanceBuffer,
    line_instances: InstanceBuffer,
}

impl ScenePipelines {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let multisample = wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        };
        let color_target = [Some(wgpu::ColorTargetState {
            format: surface_format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        // Mesh pipeline
        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MESH_SHADER.into()),
        });

        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<MeshInstance>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32x4,
                            7 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &color_target,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                // Push filled faces back so coplanar wireframe edges win.
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 1.0,
                    clamp: 0.0,
                },
            }),
            multisample,
            multiview: None,
            cache: None,
        });

        // Line pipeline
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::LINE_SHADER.into()),
        });

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &line_shader,
                entry_point: Some("vs_line"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<LineInstance>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            1 => Float32x4,
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &line_shader,
                entry_point: Some("fs_line"),
                compilation_options: Default::default(),
                targets: &color_target,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample,
            multiview: None,
            cache: None,
        });

        let mesh_instances = InstanceBuffer::new(
            device,
            "mesh_instance_buffer",
            64 * std::mem::size_of::<MeshInstance>() as u64,
        );
        let line_instances = InstanceBuffer::new(
            device,
            "line_instance_buffer",
            64 * std::mem::size_of::<LineInstance>() as u64,
        );

        Self {
            mesh_pipeline,
            line_pipeline,
            uniform_buffer,
            uniform_bind_group,
            geometry: HashMap::new(),
            mesh_instances,
            line_instances,
        }
    }

    /// Upload geometry for nodes drawn for the first time.
    fn sync_geometry(&mut self, device: &wgpu::Device, scene: &Scene, draws: &FrameDraws) {
        let ids = draws
            .meshes
            .iter()
            .map(|(id, _)| *id)
            .chain(draws.lines.iter().map(|(id, _)| *id));
        for id in ids {
            if self.geometry.contains_key(&id) {
                continue;
            }
            let uploaded = match scene.get(id).map(|n| &n.kind) {
                Some(NodeKind::Mesh { geometry, .. }) => upload_mesh(device, geometry),
                Some(NodeKind::LineSegments { geometry, .. }) => upload_lines(device, geometry),
                _ => continue,
            };
            tracing::debug!(node = %id.short(), vertices = uploaded.count, "uploaded geometry");
            self.geometry.insert(id, uploaded);
        }
    }

    /// Render one frame of the scene into `target`.
    ///
    /// With multisampling, `target` is the multisampled texture and
    /// `resolve_target` the surface texture.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        resolve_target: Option<&wgpu::TextureView>,
        depth: &wgpu::TextureView,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&frame_uniforms(scene, camera)),
        );

        let draws = collect_draws(scene);
        self.sync_geometry(device, scene, &draws);

        let mesh_data: Vec<MeshInstance> = draws.meshes.iter().map(|(_, i)| *i).collect();
        let line_data: Vec<LineInstance> = draws.lines.iter().map(|(_, i)| *i).collect();
        self.mesh_instances
            .write(device, queue, bytemuck::cast_slice(&mesh_data));
        self.line_instances
            .write(device, queue, bytemuck::cast_slice(&line_data));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let bg = scene.background;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg.r as f64,
                            g: bg.g as f64,
                            b: bg.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            // Filled meshes
            if !draws.meshes.is_empty() {
                pass.set_pipeline(&self.mesh_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(1, self.mesh_instances.buffer.slice(..));
                for (instance, (id, _)) in draws.meshes.iter().enumerate() {
                    let Some(geo) = self.geometry.get(id) else {
                        continue;
                    };
                    let Some(indices) = &geo.index_buffer else {
                        continue;
                    };
                    let instance = instance as u32;
                    pass.set_vertex_buffer(0, geo.vertex_buffer.slice(..));
                    pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..geo.count, 0, instance..instance + 1);
                }
            }

            // Wireframe lines
            if !draws.lines.is_empty() {
                pass.set_pipeline(&self.line_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(1, self.line_instances.buffer.slice(..));
                for (instance, (id, _)) in draws.lines.iter().enumerate() {
                    let Some(geo) = self.geometry.get(id) else {
                        continue;
                    };
                    let instance = instance as u32;
                    pass.set_vertex_buffer(0, geo.vertex_buffer.slice(..));
                    pass.draw(0..geo.count, instance..instance + 1);
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewloop_common::Color;
    use viewloop_scene::{
        BoxGeometry, DirectionalLight, LineBasicMaterial, Node, PhongMaterial, wireframe,
    };

    fn cube_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add(
            Node::directional_light(DirectionalLight::new(Color::WHITE, 2.0))
                .with_position(Vec3::new(-1.0, 2.0, 4.0)),
        );
        let mesh = BoxGeometry::default().with_segments(2, 2, 2).build();
        let lines = wireframe(&mesh);
        let group = scene.add(Node::group().with_position(Vec3::new(0.0, 1.0, 0.0)));
        scene
            .add_child(group, Node::mesh(mesh, PhongMaterial::new(Color::from_hex(0x515151))))
            .unwrap();
        scene
            .add_child(
                group,
                Node::line_segments(lines, LineBasicMaterial::new(Color::from_hex(0xffff00))),
            )
            .unwrap();
        scene
    }

    #[test]
    fn gpu_structs_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 112);
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(std::mem::size_of::<MeshInstance>(), 96);
        assert_eq!(std::mem::size_of::<LineInstance>(), 80);
    }

    #[test]
    fn draws_skip_groups_and_lights() {
        let draws = collect_draws(&cube_scene());
        assert_eq!(draws.meshes.len(), 1);
        assert_eq!(draws.lines.len(), 1);
        // Children inherit the group's translation.
        assert_eq!(draws.meshes[0].1.model_3, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(draws.lines[0].1.color, [1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn uniforms_use_first_light() {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        camera.position = Vec3::new(0.0, 0.0, 2.0);
        let u = frame_uniforms(&cube_scene(), &camera);

        let dir = Vec3::new(-1.0, 2.0, 4.0).normalize();
        assert_eq!(u.light_dir, dir.extend(0.0).to_array());
        assert_eq!(u.light_color, [2.0, 2.0, 2.0, 1.0]);
        assert_eq!(u.camera_pos, [0.0, 0.0, 2.0, 1.0]);
    }

    #[test]
    fn unlit_scene_has_black_light() {
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let u = frame_uniforms(&Scene::new(), &camera);
        assert_eq!(u.light_color, [0.0, 0.0, 0.0, 1.0]);
    }
}
