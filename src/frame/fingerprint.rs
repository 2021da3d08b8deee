//! Frame and stack fingerprints.
//!
//! Fingerprints are blake3 digests truncated to 64 bits. Collisions are
//! possible and accepted.

use super::Frame;
use crate::utils::config::UNKNOWN_COMPONENT;

/// Fingerprint of a single frame: package base name plus function name
pub fn fingerprint_of(frame: &Frame) -> u64 {
    let mut hasher = blake3::Hasher::new();
    write_frame(&mut hasher, frame);
    truncate(&hasher)
}

fn write_frame(hasher: &mut blake3::Hasher, frame: &Frame) {
    let package = frame.package_base_name();
    hasher.update(non_empty(package).as_bytes());
    hasher.update(&[0]);
    hasher.update(non_empty(&frame.function).as_bytes());
    hasher.update(&[0]);
}

fn non_empty(component: &str) -> &str {
    if component.is_empty() {
        UNKNOWN_COMPONENT
    } else {
        component
    }
}

fn truncate(hasher: &blake3::Hasher) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Cumulative fingerprints over a stack of frames
///
/// Each pushed frame gets a fingerprint covering itself and every frame
/// below it, so the same function reached through different callers
/// hashes differently.
#[derive(Debug, Clone, Default)]
pub struct StackHasher {
    levels: Vec<blake3::Hasher>,
}

impl StackHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame and return the fingerprint of the whole stack
    pub fn push(&mut self, frame: &Frame) -> u64 {
        let mut hasher = self.levels.last().cloned().unwrap_or_default();
        write_frame(&mut hasher, frame);
        let fingerprint = truncate(&hasher);
        self.levels.push(hasher);
        fingerprint
    }

    pub fn pop(&mut self) {
        self.levels.pop();
    }

    pub fn truncate(&mut self, depth: usize) {
        self.levels.truncate(depth);
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_frames_compare_equal() {
        assert_eq!(fingerprint_of(&Frame::default()), fingerprint_of(&Frame::default()));
    }

    #[test]
    fn test_fingerprint_ignores_file_and_line() {
        let a = Frame::new("run", "/usr/lib/libfoo.so").with_file("a.c", 1);
        let b = Frame::new("run", "/opt/libfoo.so").with_file("b.c", 99);
        assert_eq!(fingerprint_of(&a), fingerprint_of(&b));
    }

    #[test]
    fn test_fingerprint_components_are_separated() {
        let a = Frame::new("bc", "a");
        let b = Frame::new("c", "ab");
        assert_ne!(fingerprint_of(&a), fingerprint_of(&b));
    }

    #[test]
    fn test_stack_fingerprint_depends_on_ancestors() {
        let leaf = Frame::new("leaf", "pkg");

        let mut first = StackHasher::new();
        first.push(&Frame::new("a", "pkg"));
        let via_a = first.push(&leaf);

        let mut second = StackHasher::new();
        second.push(&Frame::new("b", "pkg"));
        let via_b = second.push(&leaf);

        assert_ne!(via_a, via_b);
        assert_ne!(via_a, fingerprint_of(&leaf));
    }

    #[test]
    fn test_stack_hasher_pop_restores_level() {
        let mut hasher = StackHasher::new();
        let root = hasher.push(&Frame::new("root", ""));
        hasher.push(&Frame::new("child", ""));
        hasher.pop();
        assert_eq!(hasher.depth(), 1);

        let mut fresh = StackHasher::new();
        assert_eq!(fresh.push(&Frame::new("root", "")), root);
    }
}
