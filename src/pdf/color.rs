//! RGB colors for fills, strokes and text.

/// An 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    red: u8,
    green: u8,
    blue: u8,
}

impl Rgb {
    /// Pure white.
    pub const WHITE: Self = Self::from_hex(0x00ff_ffff);
    /// Near-black used for body text.
    pub const INK: Self = Self::from_hex(0x0011_1827);
    /// Muted gray used for secondary text and rules.
    pub const MUTED: Self = Self::from_hex(0x006b_7280);
    /// Light gray used for table headers and placeholders.
    pub const LIGHT: Self = Self::from_hex(0x00f3_f4f6);
    /// Border gray.
    pub const BORDER: Self = Self::from_hex(0x00d1_d5db);

    /// Creates a color from individual channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Creates a color from a `0xRRGGBB` literal.
    ///
    /// # Examples
    ///
    /// ```
    /// use site_protocol::pdf::Rgb;
    ///
    /// let red = Rgb::from_hex(0x00b9_1c1c);
    /// assert_eq!(red.channels(), (0xb9, 0x1c, 0x1c));
    /// ```
    #[must_use]
    pub const fn from_hex(value: u32) -> Self {
        let [_, red, green, blue] = value.to_be_bytes();
        Self { red, green, blue }
    }

    /// Returns the raw channels.
    #[must_use]
    pub const fn channels(self) -> (u8, u8, u8) {
        (self.red, self.green, self.blue)
    }

    /// Returns the channels scaled to the `0.0..=1.0` range used by PDF
    /// color operators.
    #[must_use]
    pub fn components(self) -> [f32; 3] {
        [
            f32::from(self.red) / 255.0,
            f32::from(self.green) / 255.0,
            f32::from(self.blue) / 255.0,
        ]
    }

    /// Formats the color as `#rrggbb`.
    #[must_use]
    pub fn to_hex_string(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}
