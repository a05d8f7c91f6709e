//! Vertex buffer layouts for the per-instance records defined in canvas-ui.

use canvas_ui::{QuadVertex, WidgetInstance};

/// Unit quad corners, expanded per instance in the vertex shader
pub(crate) const UNIT_QUAD: [[f32; 2]; 4] = [
    [-1.0, -1.0], // top-left
    [1.0, -1.0],  // top-right
    [1.0, 1.0],   // bottom-right
    [-1.0, 1.0],  // bottom-left
];

pub(crate) fn unit_quad_desc() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x2,
    }];

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: ATTRIBUTES,
    }
}

/// Instance layout for [`QuadVertex`]; locations match `quad.wgsl`
pub(crate) fn quad_vertex_desc() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
        // center
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x2,
        },
        // half_size
        wgpu::VertexAttribute {
            offset: 8,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
        // rotation
        wgpu::VertexAttribute {
            offset: 16,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32,
        },
        // shape
        wgpu::VertexAttribute {
            offset: 20,
            shader_location: 4,
            format: wgpu::VertexFormat::Uint32,
        },
        // fill
        wgpu::VertexAttribute {
            offset: 24,
            shader_location: 5,
            format: wgpu::VertexFormat::Unorm8x4,
        },
        // stroke
        wgpu::VertexAttribute {
            offset: 28,
            shader_location: 6,
            format: wgpu::VertexFormat::Unorm8x4,
        },
        // stroke_width
        wgpu::VertexAttribute {
            offset: 32,
            shader_location: 7,
            format: wgpu::VertexFormat::Float32,
        },
        // corner_radius
        wgpu::VertexAttribute {
            offset: 36,
            shader_location: 8,
            format: wgpu::VertexFormat::Float32,
        },
        // params
        wgpu::VertexAttribute {
            offset: 40,
            shader_location: 9,
            format: wgpu::VertexFormat::Float32x4,
        },
        // uv
        wgpu::VertexAttribute {
            offset: 56,
            shader_location: 10,
            format: wgpu::VertexFormat::Float32x4,
        },
        // clip
        wgpu::VertexAttribute {
            offset: 72,
            shader_location: 11,
            format: wgpu::VertexFormat::Float32x4,
        },
    ];

    wgpu::VertexBufferLayout {
        array_stride: QuadVertex::SIZE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: ATTRIBUTES,
    }
}

/// Instance layout for [`WidgetInstance`]; locations match `widget_instance.wgsl`
pub(crate) fn widget_instance_desc() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
        // transform
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x4,
        },
        // translation
        wgpu::VertexAttribute {
            offset: 16,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
        // size
        wgpu::VertexAttribute {
            offset: 24,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32x2,
        },
        // color
        wgpu::VertexAttribute {
            offset: 32,
            shader_location: 4,
            format: wgpu::VertexFormat::Unorm8x4,
        },
        // border_color
        wgpu::VertexAttribute {
            offset: 36,
            shader_location: 5,
            format: wgpu::VertexFormat::Unorm8x4,
        },
        // corner_radius
        wgpu::VertexAttribute {
            offset: 40,
            shader_location: 6,
            format: wgpu::VertexFormat::Float32,
        },
        // border_width
        wgpu::VertexAttribute {
            offset: 44,
            shader_location: 7,
            format: wgpu::VertexFormat::Float32,
        },
    ];

    wgpu::VertexBufferLayout {
        array_stride: WidgetInstance::SIZE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: ATTRIBUTES,
    }
}
