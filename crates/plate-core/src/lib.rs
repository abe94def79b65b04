mod block;
mod commit;
mod config;
mod editor;
mod error;
mod font;
mod inline;
mod list;
mod markup;
mod media;
mod node;
mod sanitize;
mod selection;
mod snapshot;

pub use crate::block::BlockFormat;
pub use crate::commit::*;
pub use crate::config::*;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::font::*;
pub use crate::markup::*;
pub use crate::media::*;
pub use crate::node::*;
pub use crate::sanitize::*;
pub use crate::selection::{Point, RunSpan, Selection, SelectionOffset, SelectionTracker, text_runs};
pub use crate::snapshot::*;
