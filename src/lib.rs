pub mod controller;
pub mod error;
pub mod invoke;
pub mod logging;
pub mod module;
pub mod module_args;
pub mod remote;
pub mod transport;

pub use controller::{run, FinalOutcome, RunOptions};
pub use error::{ArgsError, InvokeError, ModuleError};
pub use invoke::{
    invoke, CommandPool, InvocationRequest, InvocationResult, InvocationTarget, RawExecution,
    StreamCategory, Streams, Transport,
};
pub use module::{execute, ModuleResponse};
pub use module_args::ModuleArgs;
pub use remote::{normalize, normalize_all, ComplexObject, RemoteValue};
pub use transport::{PwshTransport, TransportOptions};
