/// Application name
pub const APP_NAME: &str = "Gara";

/// Attachment transfer chunk size in bytes
pub const CHUNK_SIZE: usize = 16_384;

/// Maximum attachment size in bytes (50 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 50 * 1024 * 1024;

/// Maximum image width in pixels before downscaling kicks in
pub const MAX_IMAGE_WIDTH: u32 = 512;

/// Maximum image height in pixels before downscaling kicks in
pub const MAX_IMAGE_HEIGHT: u32 = 1024;

/// JPEG quality used when re-encoding normalized images
pub const JPEG_QUALITY: u8 = 80;

/// Namespace prefix for every durable key the client owns
pub const STORAGE_PREFIX: &str = "gara_";

/// Key prefix for per-room auth tokens; the room id is the suffix
pub const TOKEN_KEY_PREFIX: &str = "gara_token_";

/// Key holding the global preferred nickname
pub const PREFERRED_NICK_KEY: &str = "gara_preferred_nick";
