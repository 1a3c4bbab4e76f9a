//! Collision-free media file names
//!
//! `photo.jpg` is used when free. Otherwise the smallest unused `N` in
//! `photo_N.jpg` is chosen, so indices freed by deletion are reused.

/// Pick a file name for `base`.`ext` that is not among `existing`.
pub fn allocate_file_name<'a, I>(existing: I, base: &str, ext: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let plain = format!("{}.{}", base, ext);
    let prefix = format!("{}_", base);
    let suffix = format!(".{}", ext);

    let mut plain_taken = false;
    let mut taken: Vec<u64> = Vec::new();
    for name in existing {
        if name == plain {
            plain_taken = true;
        } else if let Some(index) = parse_index(name, &prefix, &suffix) {
            taken.push(index);
        }
    }

    if !plain_taken {
        return plain;
    }

    taken.sort_unstable();
    taken.dedup();
    format!("{}{}{}", prefix, first_gap(&taken), suffix)
}

/// `N` from `<prefix>N<suffix>`, digits only
fn parse_index(name: &str, prefix: &str, suffix: &str) -> Option<u64> {
    let digits = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Smallest value missing from a sorted, deduplicated sequence
fn first_gap(sorted: &[u64]) -> u64 {
    let mut expected = 0u64;
    for &value in sorted {
        if value != expected {
            break;
        }
        expected += 1;
    }
    expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_directory_uses_plain_name() {
        assert_eq!(allocate_file_name(Vec::<&str>::new(), "photo", "jpg"), "photo.jpg");
    }

    #[test]
    fn test_gap_is_filled() {
        let existing = ["photo.jpg", "photo_0.jpg", "photo_2.jpg"];
        assert_eq!(allocate_file_name(existing, "photo", "jpg"), "photo_1.jpg");
    }

    #[test]
    fn test_contiguous_run_appends() {
        let existing = ["video.mp4", "video_0.mp4", "video_1.mp4"];
        assert_eq!(allocate_file_name(existing, "video", "mp4"), "video_2.mp4");
    }

    #[test]
    fn test_plain_free_even_when_indexed_exist() {
        let existing = ["photo_0.jpg", "photo_1.jpg"];
        assert_eq!(allocate_file_name(existing, "photo", "jpg"), "photo.jpg");
    }

    #[test]
    fn test_unrelated_names_ignored() {
        let existing = [
            "photo.jpg",
            "photo_x.jpg",
            "photo_-1.jpg",
            "photo_0.png",
            "photos_0.jpg",
            "photo_.jpg",
        ];
        assert_eq!(allocate_file_name(existing, "photo", "jpg"), "photo_0.jpg");
    }

    #[test]
    fn test_first_gap() {
        assert_eq!(first_gap(&[]), 0);
        assert_eq!(first_gap(&[1, 2]), 0);
        assert_eq!(first_gap(&[0, 1, 3]), 2);
    }
}
