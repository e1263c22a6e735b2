#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod compile;
pub mod core;
pub mod errors;
pub mod memory;
pub mod settings;
pub mod state;
pub mod transform;
pub mod utils;

pub use compile::{CompileNode, CompilePass, DrawState, RenderCore, ScopedPush};
pub use crate::core::{Core, CoreFactory, CoreId, CoreKey, CoreKind, CorePayload, NodeKind, StateId};
pub use errors::{Result, StrataError};
pub use memory::{AllocError, MemoryManager};
pub use settings::CoreSettings;
pub use state::{StateChanges, StateHash, StateStacks};
pub use transform::{MemoLevel, TransformCore, TransformMatrices, TransformParams};
pub use utils::interner;
