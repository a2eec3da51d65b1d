pub mod cancellation;
pub mod console;
pub mod debug;
pub mod engine;
pub mod event_bus;
pub mod runtime_context;
pub mod streaming;

pub use cancellation::RunCancellation;
pub use console::{ConsoleEntry, ConsoleEntryKind, ConsoleSink, MemoryConsole};
pub use debug::{continue_once, has_pending_work, DebugProgress, DebugSession};
pub use engine::{
    ContinueRequest, ContinueResponse, EngineMetadata, EventStream, ExecutionRequest,
    ExecutorHandle, RemoteEngine,
};
pub use event_bus::{ExecutionEvent, IterationContext};
pub use runtime_context::{
    FakeIdGenerator, FakeTimeProvider, IdGenerator, RealIdGenerator, RealTimeProvider,
    RuntimeContext, TimeProvider,
};
pub use streaming::{delta_channel, DeltaReceiver, DeltaSender, StreamDelta, StreamedContentBuffer};
