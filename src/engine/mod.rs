//! # Engine
//!
//! Движок слияния: оценка приоритета, сжатие фрагментов, расчёт таймлайна,
//! разрешение перекрытий, размещение на холсте и экспорт.

pub mod compressor;
pub mod merge;
pub mod overlap;
pub mod placement;
pub mod priority;
pub mod timeline;

pub use merge::{merge_segments, merge_segments_async, merge_with_layout, MergeReport};
pub use overlap::OverlapPair;
pub use placement::Canvas;
pub use timeline::TimelinePlan;
