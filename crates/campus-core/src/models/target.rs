//! Upload targets: the size/type policy, bucket and path shape of one class of upload.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Destination class of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    CourseImage,
    Certificate,
    CourseMaterial,
    Avatar,
    /// Free-form image uploader used by the dashboard forms
    GalleryImage,
}

impl TargetKind {
    pub const ALL: [TargetKind; 5] = [
        TargetKind::CourseImage,
        TargetKind::Certificate,
        TargetKind::CourseMaterial,
        TargetKind::Avatar,
        TargetKind::GalleryImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::CourseImage => "course-image",
            TargetKind::Certificate => "certificate",
            TargetKind::CourseMaterial => "course-material",
            TargetKind::Avatar => "avatar",
            TargetKind::GalleryImage => "gallery-image",
        }
    }
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Unknown upload target: {}", s))
    }
}

/// Whether a bucket serves objects publicly or only through signed URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Identifiers of the entity that owns an upload, used to render the path template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParams {
    pub course_id: Option<String>,
    pub student_id: Option<String>,
    pub user_id: Option<String>,
    pub folder: Option<String>,
}

impl PathParams {
    pub fn course(course_id: impl Into<String>) -> Self {
        Self {
            course_id: Some(course_id.into()),
            ..Default::default()
        }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn certificate(student_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id.into()),
            course_id: Some(course_id.into()),
            ..Default::default()
        }
    }

    pub fn folder(folder: impl Into<String>) -> Self {
        Self {
            folder: Some(folder.into()),
            ..Default::default()
        }
    }
}

/// A path template needed an identifier the caller did not supply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing {param} for {target} upload path")]
pub struct MissingPathParam {
    pub target: TargetKind,
    pub param: &'static str,
}

/// Policy bundle for one class of uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub kind: TargetKind,
    pub max_size_bytes: u64,
    pub allowed_mime_types: BTreeSet<String>,
    pub bucket: String,
    pub visibility: Visibility,
    /// Delete every object under the owner's prefix before uploading a new one
    pub replace_existing: bool,
}

fn mime_set(types: &[&str]) -> BTreeSet<String> {
    types.iter().map(|t| t.to_string()).collect()
}

fn non_empty<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl UploadTarget {
    /// Default policy for a destination class.
    pub fn for_kind(kind: TargetKind) -> Self {
        match kind {
            TargetKind::CourseImage => Self {
                kind,
                max_size_bytes: COURSE_IMAGE_MAX_BYTES,
                allowed_mime_types: mime_set(COURSE_IMAGE_TYPES),
                bucket: BUCKET_COURSE_IMAGES.to_string(),
                visibility: Visibility::Public,
                replace_existing: false,
            },
            TargetKind::Certificate => Self {
                kind,
                max_size_bytes: CERTIFICATE_MAX_BYTES,
                allowed_mime_types: mime_set(CERTIFICATE_TYPES),
                bucket: BUCKET_CERTIFICATES.to_string(),
                visibility: Visibility::Private,
                replace_existing: false,
            },
            TargetKind::CourseMaterial => Self {
                kind,
                max_size_bytes: COURSE_MATERIAL_MAX_BYTES,
                allowed_mime_types: mime_set(COURSE_MATERIAL_TYPES),
                bucket: BUCKET_COURSE_MATERIALS.to_string(),
                visibility: Visibility::Private,
                replace_existing: false,
            },
            TargetKind::Avatar => Self {
                kind,
                max_size_bytes: AVATAR_MAX_BYTES,
                allowed_mime_types: mime_set(AVATAR_TYPES),
                bucket: BUCKET_AVATARS.to_string(),
                visibility: Visibility::Public,
                replace_existing: true,
            },
            TargetKind::GalleryImage => Self {
                kind,
                max_size_bytes: GALLERY_IMAGE_MAX_BYTES,
                allowed_mime_types: mime_set(GALLERY_IMAGE_TYPES),
                bucket: BUCKET_COURSE_IMAGES.to_string(),
                visibility: Visibility::Public,
                replace_existing: false,
            },
        }
    }

    /// Override the size limit. Zero is ignored: the limit must stay positive.
    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        if max_size_bytes > 0 {
            self.max_size_bytes = max_size_bytes;
        }
        self
    }

    /// Override the accepted content types. An empty list keeps the current set.
    pub fn with_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = types.into_iter().map(Into::into).collect();
        if !set.is_empty() {
            self.allowed_mime_types = set;
        }
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn allows(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.contains(mime_type)
    }

    /// Prefix under which all objects of one owner live (used by avatar replacement).
    pub fn owner_prefix(&self, params: &PathParams) -> Result<String, MissingPathParam> {
        let require = |value: &Option<String>, param: &'static str| {
            non_empty(value)
                .map(str::to_string)
                .ok_or(MissingPathParam {
                    target: self.kind,
                    param,
                })
        };

        match self.kind {
            TargetKind::CourseImage => Ok(format!("courses/{}", require(&params.course_id, "course_id")?)),
            TargetKind::Certificate => Ok(format!(
                "students/{}/certificates/{}",
                require(&params.student_id, "student_id")?,
                require(&params.course_id, "course_id")?
            )),
            TargetKind::CourseMaterial => Ok(format!(
                "courses/{}/materials",
                require(&params.course_id, "course_id")?
            )),
            TargetKind::Avatar => Ok(format!("users/{}", require(&params.user_id, "user_id")?)),
            TargetKind::GalleryImage => Ok(non_empty(&params.folder)
                .map(|f| f.trim_matches('/').to_string())
                .unwrap_or_default()),
        }
    }

    /// Full object path for a generated object name.
    pub fn object_path(
        &self,
        params: &PathParams,
        object_name: &str,
    ) -> Result<String, MissingPathParam> {
        let prefix = self.owner_prefix(params)?;
        if prefix.is_empty() {
            Ok(object_name.to_string())
        } else {
            Ok(format!("{}/{}", prefix, object_name))
        }
    }

    /// Accepted types as short labels, e.g. `JPG, PNG, WEBP`.
    pub fn readable_types(&self) -> String {
        readable_types(self.allowed_mime_types.iter().map(String::as_str))
    }
}

/// Convert content types to the short labels shown next to the drop zone.
pub fn readable_types<'a>(types: impl IntoIterator<Item = &'a str>) -> String {
    types
        .into_iter()
        .map(|t| match t {
            "image/jpeg" | "image/jpg" => "JPG",
            "image/png" => "PNG",
            "image/webp" => "WEBP",
            "image/gif" => "GIF",
            "application/pdf" => "PDF",
            "application/msword" => "DOC",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "DOCX",
            "application/vnd.ms-powerpoint" => "PPT",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "PPTX",
            other => other,
        })
        .fold(Vec::<&str>::new(), |mut acc, label| {
            if !acc.contains(&label) {
                acc.push(label);
            }
            acc
        })
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_have_positive_limits_and_types() {
        for kind in TargetKind::ALL {
            let target = UploadTarget::for_kind(kind);
            assert!(target.max_size_bytes > 0, "{kind} has no size limit");
            assert!(!target.allowed_mime_types.is_empty(), "{kind} has no types");
        }
    }

    #[test]
    fn only_avatar_replaces_existing() {
        for kind in TargetKind::ALL {
            let target = UploadTarget::for_kind(kind);
            assert_eq!(target.replace_existing, kind == TargetKind::Avatar);
        }
    }

    #[test]
    fn object_paths_follow_templates() {
        let course = UploadTarget::for_kind(TargetKind::CourseImage);
        assert_eq!(
            course.object_path(&PathParams::course("42"), "a.jpg").unwrap(),
            "courses/42/a.jpg"
        );

        let cert = UploadTarget::for_kind(TargetKind::Certificate);
        assert_eq!(
            cert.object_path(&PathParams::certificate("s1", "c9"), "c.pdf")
                .unwrap(),
            "students/s1/certificates/c9/c.pdf"
        );

        let material = UploadTarget::for_kind(TargetKind::CourseMaterial);
        assert_eq!(
            material.object_path(&PathParams::course("7"), "m.pdf").unwrap(),
            "courses/7/materials/m.pdf"
        );

        let avatar = UploadTarget::for_kind(TargetKind::Avatar);
        assert_eq!(
            avatar.object_path(&PathParams::user("u1"), "me.png").unwrap(),
            "users/u1/me.png"
        );

        let gallery = UploadTarget::for_kind(TargetKind::GalleryImage);
        assert_eq!(
            gallery.object_path(&PathParams::default(), "g.gif").unwrap(),
            "g.gif"
        );
        assert_eq!(
            gallery.object_path(&PathParams::folder("/home/"), "g.gif").unwrap(),
            "home/g.gif"
        );
    }

    #[test]
    fn missing_identifier_is_reported() {
        let avatar = UploadTarget::for_kind(TargetKind::Avatar);
        let err = avatar
            .object_path(&PathParams::course("1"), "x.png")
            .unwrap_err();
        assert_eq!(err.param, "user_id");
        assert_eq!(err.target, TargetKind::Avatar);

        let blank = PathParams::user("  ");
        assert!(avatar.object_path(&blank, "x.png").is_err());
    }

    #[test]
    fn builder_overrides_ignore_empty_values() {
        let target = UploadTarget::for_kind(TargetKind::CourseImage)
            .with_max_size(0)
            .with_mime_types(Vec::<String>::new());
        assert_eq!(target.max_size_bytes, COURSE_IMAGE_MAX_BYTES);
        assert_eq!(target.allowed_mime_types.len(), COURSE_IMAGE_TYPES.len());

        let target = target.with_max_size(10).with_mime_types(["image/jpeg"]);
        assert_eq!(target.max_size_bytes, 10);
        assert!(target.allows("image/jpeg"));
        assert!(!target.allows("image/png"));
    }

    #[test]
    fn readable_types_deduplicates_labels() {
        let gallery = UploadTarget::for_kind(TargetKind::GalleryImage);
        assert_eq!(gallery.readable_types(), "GIF, JPG, PNG, WEBP");
        assert_eq!(readable_types(["application/x-custom"]), "application/x-custom");
    }

    #[test]
    fn target_kind_parses_from_cli_names() {
        assert_eq!("avatar".parse::<TargetKind>().unwrap(), TargetKind::Avatar);
        assert_eq!(
            "Course-Material".parse::<TargetKind>().unwrap(),
            TargetKind::CourseMaterial
        );
        assert!("banner".parse::<TargetKind>().is_err());
    }
}
