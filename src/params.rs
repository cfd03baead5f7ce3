use thiserror::Error;

/// Highest address reachable with extended segment records (0xFFFF0 + 0xFFFF).
pub const SEGMENT_ADDRESS_LIMIT: u32 = 0x10_0000;

pub const DEFAULT_WIDTH: u32 = 16;
pub const DEFAULT_PADDING_BYTE: u8 = 0xFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("record width cannot be 0")]
    ZeroWidth,

    #[error("record width cannot exceed 255 (0xFF), got {0}")]
    WidthOutOfRange(u32),

    #[error("padding value cannot exceed 255 (0xFF), got {0}")]
    PaddingOutOfRange(u32),

    #[error("padding width cannot exceed 255 (0xFF), got {0}")]
    PaddingWidthOutOfRange(u32),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error(
        "segment addressing cannot reach {end:#X} (offset {offset:#X} + {length} bytes), limit is {SEGMENT_ADDRESS_LIMIT:#X}"
    )]
    AddressSpaceExceeded { offset: u32, length: u64, end: u64 },
}

/// Which extended-address record the binary-to-HEX writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    Linear,
    Segment,
}

/// Settings shared by both conversion directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionParams {
    /// HEX-to-binary: address floor, output byte 0 sits at this address.
    /// Binary-to-HEX: address of the first input byte.
    /// `None` lets HEX-to-binary adopt the first Data record's address.
    pub address_offset: Option<u32>,
    /// Payload bytes per Data record written (1..=255).
    pub width: u32,
    pub padding_byte: u8,
    /// Minimum run of `padding_byte` compressed into an address jump; 0 disables.
    pub padding_width: u8,
    pub start_linear_address: Option<u32>,
    pub addressing: AddressMode,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            address_offset: None,
            width: DEFAULT_WIDTH,
            padding_byte: DEFAULT_PADDING_BYTE,
            padding_width: 0,
            start_linear_address: None,
            addressing: AddressMode::Linear,
        }
    }
}

impl ConversionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_width(self.width)
    }

    pub fn set_width(&mut self, value: u32) -> Result<(), ConfigError> {
        check_width(value)?;
        self.width = value;
        Ok(())
    }

    pub fn set_padding_byte(&mut self, value: u32) -> Result<(), ConfigError> {
        self.padding_byte = u8::try_from(value).map_err(|_| ConfigError::PaddingOutOfRange(value))?;
        Ok(())
    }

    pub fn set_padding_width(&mut self, value: u32) -> Result<(), ConfigError> {
        self.padding_width =
            u8::try_from(value).map_err(|_| ConfigError::PaddingWidthOutOfRange(value))?;
        Ok(())
    }

    /// Base address used when writing HEX output.
    pub fn base_address(&self) -> u32 {
        self.address_offset.unwrap_or(0)
    }

    pub fn padding_enabled(&self) -> bool {
        self.padding_width > 0
    }

    /// Check that `length` input bytes starting at the base address stay
    /// addressable in the configured mode.
    pub fn check_span(&self, length: u64) -> Result<(), ConfigError> {
        let offset = self.base_address();
        let end = offset as u64 + length;
        let limit = match self.addressing {
            AddressMode::Linear => u32::MAX as u64 + 1,
            AddressMode::Segment => SEGMENT_ADDRESS_LIMIT as u64,
        };
        if end > limit {
            return Err(ConfigError::AddressSpaceExceeded {
                offset,
                length,
                end,
            });
        }
        Ok(())
    }
}

fn check_width(width: u32) -> Result<(), ConfigError> {
    match width {
        0 => Err(ConfigError::ZeroWidth),
        1..=0xFF => Ok(()),
        _ => Err(ConfigError::WidthOutOfRange(width)),
    }
}
