//! Declarative macros shared across the zenmon crate

/// Define a sensor enum with automatic `name()` and `all()` implementations
///
/// # Example
/// ```
/// use zenmon::metric_enum;
///
/// metric_enum! {
///     pub enum Rail {
///         Core => "Core",
///         Soc => "SoC",
///     }
/// }
///
/// let rail = Rail::Soc;
/// assert_eq!(rail.name(), "SoC");
/// assert_eq!(Rail::all().len(), 2);
/// ```
///
/// Expands to:
/// - An enum with Debug, Clone, Copy, PartialEq, Eq, Hash derives
/// - A `name(&self) -> &'static str` method
/// - An `all() -> Vec<Self>` method
#[macro_export]
macro_rules! metric_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $str:literal),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $(#[$meta])*
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }

            pub fn all() -> Vec<$name> {
                vec![$($name::$variant,)*]
            }
        }
    };
}

/// Encode the metrics of an exporter's registry into a buffer
///
/// # Example
/// ```ignore
/// // In main.rs metrics handler
/// let mut buffer = Vec::new();
/// gather_metrics!(buffer, encoder, state.exporter, "sensor");
/// ```
#[macro_export]
macro_rules! gather_metrics {
    ($buffer:expr, $encoder:expr, $exporter:expr, $name:literal) => {
        let metric_families = $exporter.registry().gather();
        if let Err(e) = $encoder.encode(&metric_families, &mut $buffer) {
            tracing::error!(concat!("Failed to encode ", $name, " metrics: {}"), e);
        }
    };
}
