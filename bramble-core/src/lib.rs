pub mod components;
mod events;
mod extensions;
mod subscribers;
pub mod transforms;
pub mod update_layer;

pub use events::{EventDispatcher, EventSender, Events};
pub use extensions::{Bundle, EntityBuilderExt};
pub use subscribers::RemovedComponentSubscriber;
pub use transforms::{look_at_rotation, TransformUpdatePlugin};
pub use update_layer::{FixedTimeStep, PerTick, Plugin, ScheduledLayer, TimeStep};
