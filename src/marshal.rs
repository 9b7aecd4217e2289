//! Conversion between call arguments and their wire form.
//!
//! A callback never crosses the wire. It is replaced by its position in the
//! argument list, and that position is the only identity it keeps: the
//! server answers with the same index and the caller resolves it against its
//! own argument list.

use crate::{
    net::WireArg,
    reply::ReplyChannel,
    types::{Arg, Args, Param},
};
use tracing::warn;

/// Replaces every callback in `args` with a reference to its position.
pub fn wrap(args: &[Arg]) -> Vec<WireArg> {
    args.iter()
        .enumerate()
        .map(|(idx, arg)| match arg {
            Arg::Value(value) => WireArg::Argument {
                value: value.clone(),
            },
            Arg::Callback(_) => WireArg::Callback { idx },
        })
        .collect()
}

pub struct Unwrapped {
    pub args: Args,
    /// Whether the caller passed at least one callback.
    pub callback_provided: bool,
}

/// Rebuilds the argument list on the serving side, binding a stand-in for
/// each callback reference to `channel`.
pub fn unwrap(wire: Vec<WireArg>, channel: &ReplyChannel) -> Unwrapped {
    let mut callback_provided = false;
    let params = wire
        .into_iter()
        .enumerate()
        .map(|(position, arg)| match arg {
            WireArg::Argument { value } => Param::Value(value),
            WireArg::Callback { idx } => {
                if idx != position {
                    warn!(idx, position, "callback reference disagrees with its position");
                }
                callback_provided = true;
                Param::Callback(channel.stand_in(position))
            }
        })
        .collect();

    Unwrapped {
        args: Args::new(params),
        callback_provided,
    }
}
