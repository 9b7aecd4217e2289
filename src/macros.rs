/// Builds a `Vec<Arg>` from anything convertible with `Arg::from`.
///
/// ```
/// use rpcallback::{args, Arg};
///
/// let done = Arg::callback(|values| println!("{values:?}"));
/// let args = args!["hello", 42, done];
/// assert_eq!(args.len(), 3);
/// assert!(args[2].is_callback());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}

/// Builds the entries for `Server::expose` from synchronous method bodies.
///
/// ```
/// use rpcallback::{exports, Server};
///
/// let mut server = Server::new();
/// server
///     .expose(exports! {
///         "echo" => |args| {
///             let msg: String = args.value(0)?;
///             args.callback(1)?.fire_with(&msg)?;
///             Ok(())
///         },
///     })
///     .unwrap();
/// assert_eq!(server.exposed(), ["echo"]);
/// ```
#[macro_export]
macro_rules! exports {
    ($($name:literal => |$args:ident| $body:block),* $(,)?) => {
        [$((
            $name,
            $crate::Export::method(move |$args: $crate::Args| -> $crate::MethodResult { $body }),
        )),*]
    };
}

#[cfg(test)]
mod tests {
    use crate::{json, Arg, Export};

    #[test]
    fn exports_expand_to_methods() {
        let entries = exports! {
            "first" => |args| {
                let _: i64 = args.value(0)?;
                Ok(())
            },
            "second" => |_args| { Ok(()) },
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "first");
        assert!(entries.iter().all(|(_, export)| matches!(export, Export::Method(_))));
    }

    #[test]
    fn args_convert_each_element() {
        let args = args![json!({"k": 1}), "s", 3u64, Arg::callback(|_| ())];
        assert_eq!(args.len(), 4);
        assert!(!args[1].is_callback());
        assert!(args[3].is_callback());
        assert!(args![].is_empty());
    }
}
