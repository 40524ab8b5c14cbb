use uuid::Uuid;

/// Returns a fresh record identifier (random v4 UUID, hyphenated).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
