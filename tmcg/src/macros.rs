/// Derives string and stream conversions from a record's `import` parser
/// and `Display` form.
macro_rules! derive_wire_conversions {
    ($t:ty) => {
        impl ::std::str::FromStr for $t {
            type Err = $crate::error::Error;

            fn from_str(s: &str) -> $crate::Result<Self> {
                Self::import(s)
            }
        }

        impl $t {
            /// Reads one record from a newline-terminated line.
            pub fn read_from(r: &mut dyn ::std::io::BufRead) -> $crate::Result<Self> {
                $crate::parse::recv(r, $crate::constants::MAX_STACK_CHARS)
            }

            /// Writes this record as a newline-terminated line.
            pub fn write_to(&self, w: &mut dyn ::std::io::Write) -> $crate::Result<()> {
                $crate::parse::send(w, self)
            }
        }
    };
}
