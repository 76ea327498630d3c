//! Benchmark workloads for the Tessera transactional buffer.
//!
//! - [`Vertex`]: a 32-byte record standing in for GPU vertex data
//! - [`sprite_quads`]: a batch of `n` quads (4 vertices each)
//! - [`fragmented_buffer`]: a committed buffer with every other batch retired
//! - [`churn_tick`]: one frame of retire-oldest / append-new traffic

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::VecDeque;

use tessera_alloc::{BufferConfig, BufferError, Token, TransactionalBuffer, VecStore};

/// Position, UV, and packed colour.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Texture coordinate.
    pub uv: [f32; 2],
    /// RGBA8.
    pub color: u32,
}

/// Heap-backed buffer of vertices, one slot per vertex.
pub type VertexBuffer = TransactionalBuffer<Vertex, VecStore<Vertex>>;

/// Build an empty vertex buffer with `capacity` slots.
pub fn vertex_buffer(capacity: u32) -> Result<VertexBuffer, BufferError> {
    let config = BufferConfig::new(1, capacity);
    let store = VecStore::for_config(&config);
    TransactionalBuffer::new(config, store)
}

/// `n` axis-aligned quads laid out along x.
pub fn sprite_quads(n: usize) -> Vec<Vertex> {
    let mut out = Vec::with_capacity(n * 4);
    for i in 0..n {
        let x = i as f32;
        for (dx, dy) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            out.push(Vertex {
                position: [x + dx, dy, 0.0],
                uv: [dx, dy],
                color: 0xffff_ffff,
            });
        }
    }
    out
}

/// Commit `batches` batches of `quads_per_batch` quads, then retire every
/// other one. Leaves `batches / 2` interior holes in the free list.
pub fn fragmented_buffer(
    batches: usize,
    quads_per_batch: usize,
) -> Result<(VertexBuffer, Vec<Token>), BufferError> {
    let mut buf = vertex_buffer(0)?;
    let tokens = (0..batches)
        .map(|_| buf.write(sprite_quads(quads_per_batch)))
        .collect::<Result<Vec<Token>, _>>()?;
    buf.commit()?;

    let mut survivors = Vec::with_capacity(batches / 2 + 1);
    for (i, t) in tokens.into_iter().enumerate() {
        if i % 2 == 0 {
            buf.remove(t)?;
        } else {
            survivors.push(t);
        }
    }
    buf.commit()?;
    Ok((buf, survivors))
}

/// One frame of churn: retire the oldest live batch, append a new one.
pub fn churn_tick(
    buf: &mut VertexBuffer,
    live: &mut VecDeque<Token>,
    quads: usize,
) -> Result<(), BufferError> {
    if let Some(oldest) = live.pop_front() {
        buf.remove(oldest)?;
    }
    live.push_back(buf.write(sprite_quads(quads))?);
    buf.commit()?;
    Ok(())
}
