/// Asserts that running `$run` panics. The block is wrapped in
/// [`AssertUnwindSafe`](std::panic::AssertUnwindSafe) so that containers can be mutated by the
/// block and inspected afterwards, which is exactly what rollback tests need.
#[allow(unused_macros)]
macro_rules! assert_panics {
    ($run:block) => {
        assert_panics!($run, "assertion failed to panic")
    };
    ($run:block, $msg:literal) => {
        assert!(
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $run)).is_err(),
            $msg
        );
        println!("^ panic caught");
    };
}

#[allow(unused_imports)]
pub(crate) use assert_panics;
