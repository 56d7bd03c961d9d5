/// Rounds an allocation request up to the block granularity.
///
/// Payload sizes advance in 4-byte steps, and a zero-byte request still
/// yields a real, releasable 4-byte block.
///
/// # Examples
///
/// ```rust
/// use rmalloc::align4;
///
/// assert_eq!(align4!(0), 4);
/// assert_eq!(align4!(10), 12);
/// assert_eq!(align4!(12), 12);
/// ```
#[macro_export]
macro_rules! align4 {
  ($value:expr) => {
    (($value).max(1) + 3) & !3usize
  };
}

#[cfg(test)]
mod tests {
  #[test]
  fn test_align4() {
    assert_eq!(align4!(0usize), 4);

    let mut alignments = Vec::new();

    for i in 0..10usize {
      let sizes = (4 * i + 1)..=(4 * (i + 1));

      let expected_alignment = 4 * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align4!(size));
      }
    }
  }
}
