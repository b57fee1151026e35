//! crates/quran_viewer_core/src/index.rs
//!
//! Static reference data for the 604-page layout: where every chapter and
//! every section starts. Must stay aligned with the numbering the content
//! providers use.

use crate::domain::TOTAL_PAGES;
use crate::ports::{PortError, PortResult};

/// A chapter (major division) of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorDivision {
    pub number: u16,
    pub name: &'static str,
    pub start_page: u16,
}

const fn major(number: u16, name: &'static str, start_page: u16) -> MajorDivision {
    MajorDivision {
        number,
        name,
        start_page,
    }
}

pub const MAJOR_DIVISIONS: [MajorDivision; 114] = [
    major(1, "Al-Fatihah", 1),
    major(2, "Al-Baqarah", 2),
    major(3, "Ali 'Imran", 50),
    major(4, "An-Nisa", 77),
    major(5, "Al-Ma'idah", 106),
    major(6, "Al-An'am", 128),
    major(7, "Al-A'raf", 151),
    major(8, "Al-Anfal", 177),
    major(9, "At-Tawbah", 187),
    major(10, "Yunus", 208),
    major(11, "Hud", 221),
    major(12, "Yusuf", 235),
    major(13, "Ar-Ra'd", 249),
    major(14, "Ibrahim", 255),
    major(15, "Al-Hijr", 262),
    major(16, "An-Nahl", 267),
    major(17, "Al-Isra", 282),
    major(18, "Al-Kahf", 293),
    major(19, "Maryam", 305),
    major(20, "Taha", 312),
    major(21, "Al-Anbya", 322),
    major(22, "Al-Hajj", 332),
    major(23, "Al-Mu'minun", 342),
    major(24, "An-Nur", 350),
    major(25, "Al-Furqan", 359),
    major(26, "Ash-Shu'ara", 367),
    major(27, "An-Naml", 377),
    major(28, "Al-Qasas", 385),
    major(29, "Al-'Ankabut", 396),
    major(30, "Ar-Rum", 404),
    major(31, "Luqman", 411),
    major(32, "As-Sajdah", 415),
    major(33, "Al-Ahzab", 418),
    major(34, "Saba", 428),
    major(35, "Fatir", 434),
    major(36, "Ya-Sin", 440),
    major(37, "As-Saffat", 446),
    major(38, "Sad", 453),
    major(39, "Az-Zumar", 458),
    major(40, "Ghafir", 467),
    major(41, "Fussilat", 477),
    major(42, "Ash-Shuraa", 483),
    major(43, "Az-Zukhruf", 489),
    major(44, "Ad-Dukhan", 496),
    major(45, "Al-Jathiyah", 499),
    major(46, "Al-Ahqaf", 502),
    major(47, "Muhammad", 507),
    major(48, "Al-Fath", 511),
    major(49, "Al-Hujurat", 515),
    major(50, "Qaf", 518),
    major(51, "Adh-Dhariyat", 520),
    major(52, "At-Tur", 523),
    major(53, "An-Najm", 526),
    major(54, "Al-Qamar", 528),
    major(55, "Ar-Rahman", 531),
    major(56, "Al-Waqi'ah", 534),
    major(57, "Al-Hadid", 537),
    major(58, "Al-Mujadila", 542),
    major(59, "Al-Hashr", 545),
    major(60, "Al-Mumtahanah", 549),
    major(61, "As-Saf", 551),
    major(62, "Al-Jumu'ah", 553),
    major(63, "Al-Munafiqun", 554),
    major(64, "At-Taghabun", 556),
    major(65, "At-Talaq", 558),
    major(66, "At-Tahrim", 560),
    major(67, "Al-Mulk", 562),
    major(68, "Al-Qalam", 564),
    major(69, "Al-Haqqah", 566),
    major(70, "Al-Ma'arij", 568),
    major(71, "Nuh", 570),
    major(72, "Al-Jinn", 572),
    major(73, "Al-Muzzammil", 574),
    major(74, "Al-Muddaththir", 575),
    major(75, "Al-Qiyamah", 577),
    major(76, "Al-Insan", 578),
    major(77, "Al-Mursalat", 580),
    major(78, "An-Naba", 582),
    major(79, "An-Nazi'at", 583),
    major(80, "'Abasa", 585),
    major(81, "At-Takwir", 586),
    major(82, "Al-Infitar", 587),
    major(83, "Al-Mutaffifin", 587),
    major(84, "Al-Inshiqaq", 589),
    major(85, "Al-Buruj", 590),
    major(86, "At-Tariq", 591),
    major(87, "Al-A'la", 591),
    major(88, "Al-Ghashiyah", 592),
    major(89, "Al-Fajr", 593),
    major(90, "Al-Balad", 594),
    major(91, "Ash-Shams", 595),
    major(92, "Al-Layl", 595),
    major(93, "Ad-Duhaa", 596),
    major(94, "Ash-Sharh", 596),
    major(95, "At-Tin", 597),
    major(96, "Al-'Alaq", 597),
    major(97, "Al-Qadr", 598),
    major(98, "Al-Bayyinah", 598),
    major(99, "Az-Zalzalah", 599),
    major(100, "Al-'Adiyat", 599),
    major(101, "Al-Qari'ah", 600),
    major(102, "At-Takathur", 600),
    major(103, "Al-'Asr", 601),
    major(104, "Al-Humazah", 601),
    major(105, "Al-Fil", 601),
    major(106, "Quraysh", 602),
    major(107, "Al-Ma'un", 602),
    major(108, "Al-Kawthar", 602),
    major(109, "Al-Kafirun", 603),
    major(110, "An-Nasr", 603),
    major(111, "Al-Masad", 603),
    major(112, "Al-Ikhlas", 604),
    major(113, "Al-Falaq", 604),
    major(114, "An-Nas", 604),
];

/// Start page of each of the 30 sections (structural divisions).
pub const STRUCTURAL_DIVISION_START_PAGES: [u16; 30] = [
    1, 22, 42, 62, 82, 102, 121, 142, 162, 182, 201, 222, 242, 262, 282, 302, 322, 342, 362, 382,
    402, 422, 442, 462, 482, 502, 522, 542, 562, 582,
];

/// Clamps any requested page number into `[1, TOTAL_PAGES]`.
pub fn clamp_page(n: i64) -> u16 {
    n.clamp(1, TOTAL_PAGES as i64) as u16
}

pub fn page_for_major_division(number: u16) -> PortResult<u16> {
    major_division(number).map(|d| d.start_page)
}

pub fn page_for_structural_division(number: u16) -> PortResult<u16> {
    if number == 0 {
        return Err(PortError::NotFound("Section 0 does not exist".to_string()));
    }
    STRUCTURAL_DIVISION_START_PAGES
        .get(usize::from(number) - 1)
        .copied()
        .ok_or_else(|| PortError::NotFound(format!("Section {} does not exist", number)))
}

pub fn major_division(number: u16) -> PortResult<&'static MajorDivision> {
    if number == 0 {
        return Err(PortError::NotFound("Chapter 0 does not exist".to_string()));
    }
    MAJOR_DIVISIONS
        .get(usize::from(number) - 1)
        .ok_or_else(|| PortError::NotFound(format!("Chapter {} does not exist", number)))
}

/// The section a page belongs to.
pub fn structural_division_for_page(page: u16) -> u16 {
    let page = clamp_page(i64::from(page));
    let position = STRUCTURAL_DIVISION_START_PAGES.partition_point(|&start| start <= page);
    position as u16
}

/// Chapters starting on `page`, or the chapter running through it when none
/// starts there. Used as a fallback when a provider omits the chapter name.
pub fn major_divisions_on_page(page: u16) -> Vec<&'static MajorDivision> {
    let page = clamp_page(i64::from(page));
    let starting: Vec<&'static MajorDivision> = MAJOR_DIVISIONS
        .iter()
        .filter(|d| d.start_page == page)
        .collect();
    if !starting.is_empty() {
        return starting;
    }
    let last_started = MAJOR_DIVISIONS.partition_point(|d| d.start_page <= page);
    last_started
        .checked_sub(1)
        .and_then(|i| MAJOR_DIVISIONS.get(i))
        .into_iter()
        .collect()
}

pub fn next_page(page: u16) -> u16 {
    clamp_page(i64::from(page) + 1)
}

pub fn previous_page(page: u16) -> u16 {
    clamp_page(i64::from(page) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_is_identity_inside_range() {
        for n in 1..=TOTAL_PAGES {
            assert_eq!(clamp_page(i64::from(n)), n);
        }
    }

    #[test]
    fn clamp_bounds_out_of_range_values() {
        assert_eq!(clamp_page(0), 1);
        assert_eq!(clamp_page(-40), 1);
        assert_eq!(clamp_page(605), TOTAL_PAGES);
        assert_eq!(clamp_page(i64::MAX), TOTAL_PAGES);
    }

    #[test]
    fn major_division_lookup() {
        assert_eq!(page_for_major_division(1).unwrap(), 1);
        assert_eq!(page_for_major_division(2).unwrap(), 2);
        assert_eq!(page_for_major_division(18).unwrap(), 293);
        assert_eq!(page_for_major_division(114).unwrap(), 604);
        assert!(matches!(page_for_major_division(0), Err(PortError::NotFound(_))));
        assert!(matches!(page_for_major_division(115), Err(PortError::NotFound(_))));
    }

    #[test]
    fn structural_division_lookup() {
        assert_eq!(page_for_structural_division(1).unwrap(), 1);
        assert_eq!(page_for_structural_division(30).unwrap(), 582);
        assert!(matches!(page_for_structural_division(0), Err(PortError::NotFound(_))));
        assert!(matches!(page_for_structural_division(31), Err(PortError::NotFound(_))));
    }

    #[test]
    fn tables_are_sorted_and_in_range() {
        for pair in MAJOR_DIVISIONS.windows(2) {
            assert!(pair[0].start_page <= pair[1].start_page);
            assert_eq!(pair[0].number + 1, pair[1].number);
        }
        for pair in STRUCTURAL_DIVISION_START_PAGES.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(MAJOR_DIVISIONS.iter().all(|d| d.start_page <= TOTAL_PAGES));
    }

    #[test]
    fn section_for_page() {
        assert_eq!(structural_division_for_page(1), 1);
        assert_eq!(structural_division_for_page(21), 1);
        assert_eq!(structural_division_for_page(22), 2);
        assert_eq!(structural_division_for_page(604), 30);
    }

    #[test]
    fn chapters_on_page() {
        let first: Vec<u16> = major_divisions_on_page(1).iter().map(|d| d.number).collect();
        assert_eq!(first, vec![1]);
        let mid_baqarah: Vec<u16> = major_divisions_on_page(10).iter().map(|d| d.number).collect();
        assert_eq!(mid_baqarah, vec![2]);
        let last: Vec<u16> = major_divisions_on_page(604).iter().map(|d| d.number).collect();
        assert_eq!(last, vec![112, 113, 114]);
    }

    #[test]
    fn navigation_is_bounded() {
        assert_eq!(next_page(604), 604);
        assert_eq!(previous_page(1), 1);
        assert_eq!(next_page(10), 11);
    }
}
