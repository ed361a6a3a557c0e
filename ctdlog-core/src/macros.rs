// Diagnostics go to `log` on hosted builds, `defmt` on probes, nowhere otherwise.
// Arguments must stay `defmt::Format`-compatible (integers, floats, &str).

#[cfg(feature = "log")]
macro_rules! diag_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(all(not(feature = "log"), feature = "defmt"))]
macro_rules! diag_warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! diag_warn {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! diag_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(all(not(feature = "log"), feature = "defmt"))]
macro_rules! diag_debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! diag_debug {
    ($($arg:tt)*) => {};
}
