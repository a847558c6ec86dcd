//! Bucket names, size limits and content type lists for the upload targets.

pub const MIB: u64 = 1024 * 1024;

pub const BUCKET_COURSE_IMAGES: &str = "course-images";
pub const BUCKET_CERTIFICATES: &str = "certificates";
pub const BUCKET_COURSE_MATERIALS: &str = "course-materials";
pub const BUCKET_AVATARS: &str = "avatars";

pub const COURSE_IMAGE_MAX_BYTES: u64 = 5 * MIB;
pub const CERTIFICATE_MAX_BYTES: u64 = 10 * MIB;
pub const COURSE_MATERIAL_MAX_BYTES: u64 = 20 * MIB;
pub const AVATAR_MAX_BYTES: u64 = 2 * MIB;
pub const GALLERY_IMAGE_MAX_BYTES: u64 = 5 * MIB;

pub const COURSE_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];
pub const CERTIFICATE_TYPES: &[&str] = &["application/pdf"];
pub const COURSE_MATERIAL_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];
pub const AVATAR_TYPES: &[&str] = &["image/jpeg", "image/png"];
pub const GALLERY_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

/// Default `cache-control` max-age sent with uploads, in seconds.
pub const DEFAULT_UPLOAD_CACHE_CONTROL_SECS: u64 = 3600;

/// Default lifetime of signed URLs for private buckets, in seconds.
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 3600;

/// Interval of the cosmetic upload progress ticker.
pub const DEFAULT_PROGRESS_TICK_MS: u64 = 200;
