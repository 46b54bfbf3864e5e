//! Collaboratively edited rich text.
//!
//! The document is a canonical list of styled runs terminated by a single
//! end-of-file sentinel. Edits arrive as ordered [`EditEvent`]s; events that
//! were generated against an older document timezone are reconciled against
//! the retained event queue before being applied. Undo reloads the nearest
//! snapshot and replays history without the undone edit.
//!
//! Layout ([`wrap`]) is a pure function over runs and lives alongside the
//! model only because it shares the run representation.

pub mod doc;
pub mod error;
pub mod event;
pub mod interval;
pub mod model;
pub mod queue;
pub mod run;
pub mod style;
pub mod transform;
pub mod wrap;

pub use doc::{Doc, DocSnapshot, Selection, UserId};
pub use error::DocError;
pub use event::{EditEvent, EditFootprint, EditKind, PositionEdit, Timezone};
pub use interval::{Interval, IntervalIndex};
pub use model::{ApplyOutcome, DocConfig, DocumentModel, DEFAULT_CUTOFF, DEFAULT_SNAPSHOT_EVERY};
pub use queue::{AppliedEvent, EventQueue, QueueEntry};
pub use run::{canonicalize, text_len, Run, EOF_CHAR};
pub use style::TextStyle;
pub use transform::{classify_delete, transform_delete, transform_insert, Boundary, DeleteOverlap};
pub use wrap::{
    wrap, Measurer, MetricsCache, MetricsKey, MonospaceMeasurer, WordMetrics, WrapLayout,
    WrappedLine, WrappedWord,
};
