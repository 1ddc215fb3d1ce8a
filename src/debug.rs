#[cfg(baremetal)]
use core::fmt::{Error, Write};

#[cfg(all(not(test), baremetal, any(feature = "debug-print", feature = "print-panics")))]
#[macro_export]
macro_rules! print
{
    ($($args:tt)+) => ({
            use core::fmt::Write;
            let _ = write!(crate::debug::SbiConsole, $($args)+);
    });
}

#[cfg(all(not(test), baremetal, not(any(feature = "debug-print", feature = "print-panics"))))]
#[macro_export]
macro_rules! print {
    ($($args:tt)+) => {{
        ()
    }};
}

#[cfg(baremetal)]
#[macro_export]
macro_rules! println
{
	() => ({
		print!("\r\n")
	});
	($fmt:expr) => ({
		print!(concat!($fmt, "\r\n"))
	});
	($fmt:expr, $($args:tt)+) => ({
		print!(concat!($fmt, "\r\n"), $($args)+)
	});
}

/// Byte-at-a-time console on top of the firmware's legacy putchar call.
/// Machine mode owns the UART; the kernel never maps it.
#[cfg(baremetal)]
pub struct SbiConsole;

#[cfg(baremetal)]
impl Write for SbiConsole {
    fn write_str(&mut self, s: &str) -> Result<(), Error> {
        for c in s.bytes() {
            crate::arch::sbi::console_putchar(c);
        }
        Ok(())
    }
}

#[cfg(feature = "debug-print")]
#[macro_export]
macro_rules! klog
{
	() => ({
		print!(" [{}:{}]", file!(), line!())
	});
	($fmt:expr) => ({
        print!(concat!(" [{}:{} ", $fmt, "]"), file!(), line!())
	});
	($fmt:expr, $($args:tt)+) => ({
		print!(concat!(" [{}:{} ", $fmt, "]"), file!(), line!(), $($args)+)
	});
}

#[cfg(not(feature = "debug-print"))]
#[macro_export]
macro_rules! klog {
    ($($args:tt)*) => {{
        ()
    }};
}
