//! Rendering: dispatch of built-in kinds and custom tags over a prepared
//! document

pub mod context;
pub mod dispatch;
mod executors;
mod layout;
mod structural;

pub use context::{MacroDef, RenderContext};
pub use dispatch::{
    Dispatch, Executor, ExecutorKind, Handler, Renderer, RendererKind, RendererRegistry, TagContext,
    WILDCARD,
};
pub use layout::CONTENT_SLOT;
