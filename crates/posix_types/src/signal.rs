mod sig_action;
mod siginfo;
mod signal;

pub use sig_action::{
    SigAction, SigActionFlags, SigActionHandler, SigActionRestorer, SigSet, TryFromSigAction,
};
pub use siginfo::SigInfo;
pub use signal::Signal;
