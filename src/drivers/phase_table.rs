//! Precomputed power → firing-phase tables.
//!
//! Entry `v - 1` holds the fraction of a half cycle (scaled by `2^shift`)
//! to wait after the zero crossing so that conduction covers the share of
//! the half cycle that corresponds to level `v`:
//!
//! ```text
//!   entry(v) = round( acos(2·v/max − 1) / π · 2^shift ),   v = 1 .. max−1
//! ```
//!
//! Levels `0` and `max` never consult the table (drive forced off / on).
//! Tables are strictly decreasing, so more power always fires earlier.

/// Immutable level → phase mapping with its fixed-point scale.
#[derive(Debug)]
pub struct PhaseTable {
    max_level: u16,
    shift: u32,
    entries: &'static [u16],
}

impl PhaseTable {
    /// Percent resolution: levels 0..=100, 10-bit phase fraction.
    pub const PERCENT: Self = Self {
        max_level: 100,
        shift: 10,
        entries: &PERCENT_ENTRIES,
    };

    /// Byte resolution: levels 0..=255, 12-bit phase fraction.
    pub const FINE: Self = Self {
        max_level: 255,
        shift: 12,
        entries: &FINE_ENTRIES,
    };

    pub const fn max_level(&self) -> u16 {
        self.max_level
    }

    pub const fn shift(&self) -> u32 {
        self.shift
    }

    /// Phase fraction for an interior level (`1..max_level`).
    pub fn entry(&self, level: u16) -> Option<u16> {
        if level == 0 || level >= self.max_level {
            return None;
        }
        self.entries.get(usize::from(level - 1)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const PERCENT_ENTRIES: [u16; 99] = [
    959, 931, 911, 893, 877, 863, 849, 837, 825, 814, 804, 793, 784, 774, 765, 756,
    747, 738, 730, 722, 714, 706, 698, 690, 683, 675, 668, 661, 653, 646, 639, 632,
    625, 618, 611, 605, 598, 591, 584, 578, 571, 564, 558, 551, 545, 538, 532, 525,
    519, 512, 505, 499, 492, 486, 479, 473, 466, 460, 453, 446, 440, 433, 426, 419,
    413, 406, 399, 392, 385, 378, 371, 363, 356, 349, 341, 334, 326, 318, 310, 302,
    294, 286, 277, 268, 259, 250, 240, 231, 220, 210, 199, 187, 175, 161, 147, 131,
    113, 93, 65,
];

const FINE_ENTRIES: [u16; 254] = [
    3933, 3865, 3813, 3769, 3730, 3694, 3662, 3632, 3603, 3576, 3550, 3526, 3502,
    3479, 3457, 3436, 3415, 3395, 3375, 3356, 3337, 3319, 3301, 3283, 3266, 3249,
    3232, 3215, 3199, 3183, 3167, 3152, 3136, 3121, 3106, 3092, 3077, 3063, 3048,
    3034, 3020, 3006, 2993, 2979, 2966, 2952, 2939, 2926, 2913, 2900, 2887, 2874,
    2862, 2849, 2837, 2824, 2812, 2800, 2787, 2775, 2763, 2751, 2740, 2728, 2716,
    2704, 2693, 2681, 2669, 2658, 2647, 2635, 2624, 2613, 2601, 2590, 2579, 2568,
    2557, 2546, 2535, 2524, 2513, 2502, 2491, 2480, 2469, 2459, 2448, 2437, 2427,
    2416, 2405, 2395, 2384, 2373, 2363, 2352, 2342, 2331, 2321, 2311, 2300, 2290,
    2279, 2269, 2259, 2248, 2238, 2228, 2217, 2207, 2197, 2186, 2176, 2166, 2155,
    2145, 2135, 2125, 2114, 2104, 2094, 2084, 2074, 2063, 2053, 2043, 2033, 2022,
    2012, 2002, 1992, 1982, 1971, 1961, 1951, 1941, 1930, 1920, 1910, 1899, 1889,
    1879, 1868, 1858, 1848, 1837, 1827, 1817, 1806, 1796, 1785, 1775, 1765, 1754,
    1744, 1733, 1723, 1712, 1701, 1691, 1680, 1669, 1659, 1648, 1637, 1627, 1616,
    1605, 1594, 1583, 1572, 1561, 1550, 1539, 1528, 1517, 1506, 1495, 1483, 1472,
    1461, 1449, 1438, 1427, 1415, 1403, 1392, 1380, 1368, 1356, 1345, 1333, 1321,
    1309, 1296, 1284, 1272, 1259, 1247, 1234, 1222, 1209, 1196, 1183, 1170, 1157,
    1144, 1130, 1117, 1103, 1090, 1076, 1062, 1048, 1033, 1019, 1004, 990, 975,
    960, 944, 929, 913, 897, 881, 864, 847, 830, 813, 795, 777, 759, 740, 721, 701,
    681, 660, 639, 617, 594, 570, 546, 520, 493, 464, 434, 402, 366, 327, 283, 231,
    163,
];
