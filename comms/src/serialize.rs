use std::io;

/// Writes a value into a byte buffer for sending through an `OnoSender`.
pub trait Serialize<'a> {
    /// Serializes `self` into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to write the serialized header bytes into.
    ///
    /// # Returns
    /// An optional trailing slice that will be written right after `buf` without
    /// copying, or an io error if `self` can't be serialized.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>>;
}
