//! Helper macros for ABI function generation.
//!
//! `abi_fn!` generates the `#[unsafe(no_mangle)] pub unsafe extern "C" fn`
//! wrapper and clears the calling thread's last-error record before the body
//! runs, so every entry point starts from a clean error state.

/// Generate an exported entry point.
///
/// # Usage
///
/// ```ignore
/// abi_fn! {
///     /// Doc comment for the function.
///     fn aaconfine_example(arg: *const c_char) -> c_int {
///         // implementation body
///     }
/// }
/// ```
macro_rules! abi_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? ) -> $ret:ty
        $body:block
    ) => {
        $(#[$meta])*
        #[unsafe(no_mangle)]
        #[allow(unused_unsafe)]
        pub unsafe extern "C" fn $name( $($arg : $argty),* ) -> $ret {
            $crate::last_error::clear();
            unsafe { $body }
        }
    };
}

/// Generate an entry point for a transition taking one name argument.
///
/// The name is validated before the module is touched, so a malformed
/// argument is reported as a usage error even when initialization would fail.
macro_rules! named_transition_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $param:ident ) => $op:expr, $method:ident
    ) => {
        abi_fn! {
            $(#[$meta])*
            fn $name($param: *const ::std::ffi::c_char) -> ::std::ffi::c_int {
                let op = $op;
                match $crate::util::borrow_name(op, $param) {
                    Ok(name) => $crate::gateway_abi::complete(
                        $crate::module_state::module().and_then(|m| m.$method(name)),
                    ),
                    Err(err) => $crate::gateway_abi::complete(Err(err.into())),
                }
            }
        }
    };
}
