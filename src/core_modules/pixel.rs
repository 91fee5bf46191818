// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the vision system. It is a
// "dumb" data container for a single BGR pixel plus the single-pixel color-space
// transform the detector needs: BGR -> HSV. Anything that needs another pixel
// (connectivity, region growing, moments) belongs in higher-dimension modules
// like `color_mask` and `blob_detector`.
//
// HSV here follows the 8-bit convention that camera tooling settled on long ago:
// - Hue is the color-wheel angle halved, so it fits a byte: [0, 180).
// - Saturation is chroma relative to value, scaled to [0, 255].
// - Value is the brightest channel, [0, 255].
//
// The conversion is integer-only. Divisions by chroma and by value go through two
// 256-entry `OnceLock` lookup tables in 12-bit fixed point, so the hot path is a
// table lookup, a multiply and a shift per channel. The rounding matches the
// well-known fixed-point formulation, which keeps threshold boundaries (hue 10,
// hue 30, ...) exactly where users expect them when they tune ranges with other
// tools.

pub mod pixel {
    use std::sync::OnceLock;

    pub type Byte = u8;
    pub type Channel = Byte;
    pub type Hue = u8;
    pub type Saturation = u8;
    pub type Value = u8;
    pub type Chroma = u8;

    const CHANNELS: usize = 3;
    /// Exclusive upper bound of the 8-bit hue scale.
    pub const HUE_RANGE: i32 = 180;
    const HSV_SHIFT: u32 = 12;
    const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

    // (255 << 12) / v, rounded. Entry 0 is unused (value 0 means saturation 0).
    static SATURATION_DIV_LUT: OnceLock<[i32; 256]> = OnceLock::new();
    // (180 << 12) / (6 * chroma), rounded. Entry 0 is unused (gray has hue 0).
    static HUE_DIV_LUT: OnceLock<[i32; 256]> = OnceLock::new();

    /// A "dumb" data container representing a single BGR pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The red channel value (0-255).
        pub red: Channel,
    }

    /// A pixel in the 8-bit HSV space.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hsv {
        pub hue: Hue,
        pub saturation: Saturation,
        pub value: Value,
    }

    impl Hsv {
        pub fn new(hue: Hue, saturation: Saturation, value: Value) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }
    }

    impl Pixel {
        pub fn new(blue: Channel, green: Channel, red: Channel) -> Self {
            Pixel { blue, green, red }
        }

        fn saturation_div_table() -> &'static [i32; 256] {
            SATURATION_DIV_LUT.get_or_init(|| {
                let mut table = [0i32; 256];
                for (i, slot) in table.iter_mut().enumerate().skip(1) {
                    *slot = ((255i32 << HSV_SHIFT) as f64 / i as f64).round() as i32;
                }
                table
            })
        }

        fn hue_div_table() -> &'static [i32; 256] {
            HUE_DIV_LUT.get_or_init(|| {
                let mut table = [0i32; 256];
                for (i, slot) in table.iter_mut().enumerate().skip(1) {
                    *slot = ((HUE_RANGE << HSV_SHIFT) as f64 / (6.0 * i as f64)).round() as i32;
                }
                table
            })
        }

        /// =================================Heuristics==================================

        /// HSV Value (V): the brightest channel.
        pub fn value(&self) -> Value {
            self.red.max(self.green.max(self.blue))
        }

        /// Chroma (C): max(B,G,R) - min(B,G,R). Zero for any gray.
        pub fn chroma(&self) -> Chroma {
            self.value() - self.red.min(self.green.min(self.blue))
        }

        /// Full 8-bit BGR -> HSV conversion.
        ///
        /// - Hue: [0, 180), degrees halved. Gray pixels get hue 0.
        /// - Saturation: 255 * chroma / value, 0 for black.
        /// - Value: max channel.
        ///
        /// When several channels tie for the maximum, red wins over green and
        /// green wins over blue when picking the hue sector.
        pub fn to_hsv(&self) -> Hsv {
            let (b, g, r) = (self.blue as i32, self.green as i32, self.red as i32);
            let v = self.value() as i32;
            let diff = self.chroma() as i32;

            let s = (diff * Self::saturation_div_table()[v as usize] + HSV_ROUND) >> HSV_SHIFT;

            let sector = if v == r {
                g - b
            } else if v == g {
                b - r + 2 * diff
            } else {
                r - g + 4 * diff
            };
            let mut h = (sector * Self::hue_div_table()[diff as usize] + HSV_ROUND) >> HSV_SHIFT;
            if h < 0 {
                h += HUE_RANGE;
            }

            Hsv {
                hue: h as Hue,
                saturation: s as Saturation,
                value: v as Value,
            }
        }
    }

    impl From<&[Byte]> for Pixel {
        fn from(bytes: &[Byte]) -> Self {
            if bytes.len() != CHANNELS {
                panic!("Cannot convert {} bytes into pixel.", bytes.len());
            }
            Pixel::new(bytes[0], bytes[1], bytes[2])
        }
    }

    impl From<Pixel> for [Byte; CHANNELS] {
        fn from(pixel: Pixel) -> Self {
            [pixel.blue, pixel.green, pixel.red]
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn primaries_land_on_their_sectors() {
            assert_eq!(Pixel::new(0, 0, 255).to_hsv(), Hsv::new(0, 255, 255));
            assert_eq!(Pixel::new(0, 255, 0).to_hsv(), Hsv::new(60, 255, 255));
            assert_eq!(Pixel::new(255, 0, 0).to_hsv(), Hsv::new(120, 255, 255));
        }

        #[test]
        fn yellow_is_the_top_of_the_default_band() {
            assert_eq!(Pixel::new(0, 255, 255).to_hsv(), Hsv::new(30, 255, 255));
        }

        #[test]
        fn orange_is_inside_the_default_band() {
            let hsv = Pixel::new(0, 200, 255).to_hsv();
            assert_eq!(hsv.hue, 24);
            assert_eq!(hsv.saturation, 255);
        }

        #[test]
        fn grays_have_no_hue_or_saturation() {
            for level in [0u8, 1, 77, 128, 255] {
                let hsv = Pixel::new(level, level, level).to_hsv();
                assert_eq!(hsv, Hsv::new(0, 0, level));
            }
        }

        #[test]
        fn magenta_wraps_below_180() {
            let hsv = Pixel::new(255, 0, 255).to_hsv();
            assert_eq!(hsv.hue, 150);
        }
    }
}

// -----------------------------------------------------------------------------
// Glossary: Single-Pixel Color Terms (1D)
//
// - Hue: Angle on the color wheel describing the "color family". Stored halved
//   (0..180) so that a full turn fits one byte.
//
// - Value (HSV): Brightness defined as the maximum of the channels.
//
// - Chroma: max(B,G,R) - min(B,G,R). Zero means perfectly gray.
//
// - Saturation (HSV): Chroma divided by Value, scaled to 0..255. Drops to zero
//   near black even if hue is well-defined, which is why the target band also
//   bounds Value from below.
