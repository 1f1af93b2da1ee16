//! Generic register abstractions for typed SMN register decoding

/// Extract `width` bits of `value` starting at bit `offset`
///
/// ```
/// use zenmon_raw::extract_bits;
///
/// assert_eq!(extract_bits(0x0000_0300, 8, 3), 3);
/// ```
pub const fn extract_bits(value: u32, offset: u32, width: u32) -> u32 {
    (value >> offset) & (u32::MAX >> (32 - width))
}

/// Trait for register layouts that can be converted to/from raw SMN words
///
/// SMN registers are 32 bits wide. Layouts decode the fields a sensor needs
/// and can re-encode them, which is mostly useful for building fixtures.
///
/// # Example
///
/// ```ignore
/// use zenmon_raw::register::RegisterLayout;
///
/// #[derive(Debug, Default)]
/// struct MyStatus {
///     valid: bool,
///     reading: u16,
/// }
///
/// impl RegisterLayout for MyStatus {
///     fn to_smn_value(&self) -> u32 {
///         (self.valid as u32) | ((self.reading as u32) << 8)
///     }
///
///     fn from_smn_value(value: u32) -> Self {
///         Self {
///             valid: (value & 1) != 0,
///             reading: ((value >> 8) & 0xFFFF) as u16,
///         }
///     }
/// }
/// ```
pub trait RegisterLayout: Sized {
    /// Convert this register layout to a raw SMN word
    fn to_smn_value(&self) -> u32;

    /// Parse a raw SMN word into this register layout
    fn from_smn_value(value: u32) -> Self;

    /// Validate that the field values fit their bit widths
    ///
    /// Returns `Ok(())` if valid, or an error message if invalid.
    fn validate(&self) -> Result<(), &'static str> {
        Ok(())
    }
}

/// A hardware register with SMN address and typed layout
///
/// # Example
///
/// ```ignore
/// use zenmon_raw::register::Register;
/// use zenmon_raw::current_arch::thm::{self, ReportedTempControl};
///
/// let reg = Register::<ReportedTempControl>::decode(thm::REPORTED_TEMP_CTRL, raw);
/// let tctl = reg.layout.control_temp_millic();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Register<T: RegisterLayout> {
    /// SMN address
    pub address: u32,
    /// Typed register layout
    pub layout: T,
}

impl<T: RegisterLayout> Register<T> {
    /// Create a register by decoding a raw word read from `address`
    pub fn decode(address: u32, value: u32) -> Self {
        Self {
            address,
            layout: T::from_smn_value(value),
        }
    }
}
