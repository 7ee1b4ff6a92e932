//! Uploads service
//!
//! Two-phase material upload: store the bytes in the materials bucket, then
//! record the metadata row. The gateway has no transaction spanning both, so a
//! failed insert is followed by a compensating delete of the stored object.
//!
//! `UploadModal` carries the teacher portal's form state around an uploader.

use crate::access::{Role, StaffCapability};
use crate::catalog::{FileType, Grade};
use crate::config;
use crate::database::{Material, NewMaterial};
use crate::error::{AppError, Result};
use crate::gateway::{insert_record, Gateway, UploadOptions};
use rand::Rng;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A file picked from the local machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read a file from disk; the MIME type is guessed from the extension
    /// unless `mime_type` is given
    pub async fn read(path: &Path, mime_type: Option<&str>) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Validation(format!("Invalid file name: {:?}", path)))?
            .to_string();

        let mime_type = match mime_type {
            Some(m) => m.to_string(),
            None => guess_mime_type(&name).to_string(),
        };

        Ok(Self {
            name,
            mime_type,
            data,
        })
    }
}

/// MIME type for common document and image extensions
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let ext = file_extension(file_name)
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Extension after the last dot, if the name has one
pub fn file_extension(file_name: &str) -> Option<&str> {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Strip path separators and NUL bytes and cap the length
pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(config::MAX_FILE_NAME_LEN)
        .collect()
}

/// Collision-resistant object name: `{unix_millis}_{base36 token}[.ext]`
pub fn generate_object_name(original_name: &str) -> String {
    let mut rng = rand::thread_rng();
    let token: String = (0..config::OBJECT_NAME_TOKEN_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();

    let millis = chrono::Utc::now().timestamp_millis();

    match file_extension(&sanitize_file_name(original_name)) {
        Some(ext) => format!("{}_{}.{}", millis, token, ext),
        None => format!("{}_{}", millis, token),
    }
}

/// Object path of a material inside the materials bucket
pub fn material_object_path(grade: Grade, subject: &str, object_name: &str) -> String {
    format!("{}/{}/{}", grade, subject, object_name)
}

/// Check a material before any gateway call; returns the catalog subject name
pub fn validate_material(
    grade: Grade,
    subject: &str,
    file_type: FileType,
    file: &LocalFile,
) -> Result<&'static str> {
    let subject = grade.subject(subject).ok_or_else(|| {
        AppError::Validation(format!("{} is not taught in {} grade", subject, grade))
    })?;

    if file_type == FileType::Unsupported {
        return Err(AppError::Validation(
            "File type must be pdf or image".to_string(),
        ));
    }

    if !file_type.accepts_mime(&file.mime_type) {
        return Err(AppError::Validation(file_type.mismatch_message().to_string()));
    }

    if sanitize_file_name(&file.name).trim().is_empty() {
        return Err(AppError::Validation("File name cannot be empty".to_string()));
    }

    Ok(subject)
}

/// Uploads study materials on behalf of staff
#[derive(Clone)]
pub struct MaterialUploader<G> {
    gateway: G,
    bucket: String,
    cache_control: u32,
}

impl<G: Gateway> MaterialUploader<G> {
    pub fn new(gateway: G, bucket: impl Into<String>) -> Self {
        Self {
            gateway,
            bucket: bucket.into(),
            cache_control: config::DEFAULT_CACHE_CONTROL_SECONDS,
        }
    }

    pub fn with_cache_control(mut self, seconds: u32) -> Self {
        self.cache_control = seconds;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Store a file and record it as a material
    pub async fn upload(
        &self,
        staff: &StaffCapability,
        grade: Grade,
        subject: &str,
        file_type: FileType,
        file: &LocalFile,
    ) -> Result<Material> {
        staff.require(&[Role::Teacher, Role::Admin])?;
        let subject = validate_material(grade, subject, file_type, file)?;

        let object_name = generate_object_name(&file.name);
        let path = material_object_path(grade, subject, &object_name);

        tracing::info!(
            "Uploading {} for {} {} ({} bytes)",
            file.name,
            grade,
            subject,
            file.data.len()
        );

        let options = UploadOptions {
            cache_control: self.cache_control,
            ..UploadOptions::new(file.mime_type.clone())
        };
        self.gateway
            .upload(&self.bucket, &path, &file.data, &options)
            .await?;

        let file_url = self.gateway.public_url(&self.bucket, &path);

        let new_material = NewMaterial {
            grade,
            subject: subject.to_string(),
            file_name: sanitize_file_name(&file.name),
            file_url,
            file_type,
            uploaded_by: staff.principal().to_string(),
        };

        match insert_record::<_, Material, _>(&self.gateway, &new_material).await {
            Ok(material) => {
                tracing::info!("Material created: {}", material.id);
                Ok(material)
            }
            Err(e) => {
                tracing::warn!("Material insert failed, removing {}: {}", path, e);
                if let Err(remove_err) = self.gateway.remove(&self.bucket, &path).await {
                    tracing::error!(
                        "Orphaned object {}/{} left in storage: {}",
                        self.bucket,
                        path,
                        remove_err
                    );
                }
                Err(e)
            }
        }
    }
}

/// Lifecycle of the upload modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    #[default]
    Closed,
    Open,
    Uploading,
    Succeeded,
}

/// Form fields of the upload modal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub target: Option<(Grade, &'static str)>,
    pub file_type: FileType,
    pub file: Option<LocalFile>,
    pub error: Option<String>,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self {
            target: None,
            file_type: FileType::Pdf,
            file: None,
            error: None,
        }
    }
}

/// Teacher upload dialog
pub struct UploadModal<G> {
    uploader: MaterialUploader<G>,
    success_delay: Duration,
    form: Mutex<UploadForm>,
    phase: watch::Sender<UploadPhase>,
}

impl<G: Gateway> UploadModal<G> {
    pub fn new(uploader: MaterialUploader<G>, success_delay: Duration) -> Self {
        let (phase, _) = watch::channel(UploadPhase::Closed);
        Self {
            uploader,
            success_delay,
            form: Mutex::new(UploadForm::default()),
            phase,
        }
    }

    fn form(&self) -> MutexGuard<'_, UploadForm> {
        self.form.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn phase(&self) -> UploadPhase {
        *self.phase.borrow()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<UploadPhase> {
        self.phase.subscribe()
    }

    pub fn form_state(&self) -> UploadForm {
        self.form().clone()
    }

    /// Open the dialog for one subject
    pub fn open(&self, grade: Grade, subject: &str) -> Result<()> {
        let subject = grade.subject(subject).ok_or_else(|| {
            AppError::Validation(format!("{} is not taught in {} grade", subject, grade))
        })?;

        let mut form = self.form();
        if self.phase() == UploadPhase::Uploading {
            return Err(AppError::Validation("An upload is in progress".to_string()));
        }

        *form = UploadForm {
            target: Some((grade, subject)),
            ..UploadForm::default()
        };
        self.phase.send_replace(UploadPhase::Open);
        Ok(())
    }

    /// Switch between pdf and image; drops the current selection
    pub fn set_file_type(&self, file_type: FileType) {
        let mut form = self.form();
        form.file_type = file_type;
        form.file = None;
        form.error = None;
    }

    /// Pick a file; a MIME mismatch leaves nothing selected
    pub fn select_file(&self, file: LocalFile) -> Result<()> {
        let mut form = self.form();

        if !form.file_type.accepts_mime(&file.mime_type) {
            let message = form.file_type.mismatch_message().to_string();
            form.file = None;
            form.error = Some(message.clone());
            return Err(AppError::Validation(message));
        }

        form.file = Some(file);
        form.error = None;
        Ok(())
    }

    /// Upload the selected file, show the confirmation, then close and run
    /// `on_success`
    pub async fn submit<F>(&self, staff: &StaffCapability, on_success: F) -> Result<Material>
    where
        F: FnOnce(&Material),
    {
        let (grade, subject, file_type, file) = {
            let mut form = self.form();

            if self.phase() != UploadPhase::Open {
                return Err(AppError::Validation("Upload dialog is not open".to_string()));
            }

            let Some((grade, subject)) = form.target else {
                return Err(AppError::Validation("Upload dialog is not open".to_string()));
            };

            let Some(file) = form.file.clone() else {
                let message = "Please select a file".to_string();
                form.error = Some(message.clone());
                return Err(AppError::Validation(message));
            };

            form.error = None;
            // Claimed under the form lock so a second submit sees Uploading
            self.phase.send_replace(UploadPhase::Uploading);
            (grade, subject, form.file_type, file)
        };

        let material = match self
            .uploader
            .upload(staff, grade, subject, file_type, &file)
            .await
        {
            Ok(material) => material,
            Err(e) => {
                self.form().error = Some(format!("Error uploading file: {}", e));
                self.phase.send_replace(UploadPhase::Open);
                return Err(e);
            }
        };

        self.phase.send_replace(UploadPhase::Succeeded);
        tokio::time::sleep(self.success_delay).await;

        *self.form() = UploadForm::default();
        self.phase.send_replace(UploadPhase::Closed);
        on_success(&material);

        Ok(material)
    }

    /// Close the dialog; refused while an upload is running
    pub fn close(&self) -> bool {
        let mut form = self.form();
        if self.phase() == UploadPhase::Uploading {
            return false;
        }

        *form = UploadForm::default();
        self.phase.send_replace(UploadPhase::Closed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{hash_password, StaffVerifier};
    use crate::gateway::LocalGateway;
    use crate::services::settings::StaffCredentials;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn teacher() -> StaffCapability {
        StaffVerifier::new(StaffCredentials {
            teacher_password_hash: Some(hash_password("pw").unwrap()),
            ..StaffCredentials::default()
        })
        .verify_teacher("pw")
        .unwrap()
    }

    async fn create_test_uploader() -> (MaterialUploader<LocalGateway>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let gateway = LocalGateway::open(temp_dir.path()).await.unwrap();
        (MaterialUploader::new(gateway, "materials"), temp_dir)
    }

    fn pdf() -> LocalFile {
        LocalFile::new("Chapter 1.pdf", "application/pdf", b"%PDF-1.4".to_vec())
    }

    #[test]
    fn test_object_name_shape() {
        let name = generate_object_name("Lesson Notes.PDF");
        let (millis, rest) = name.split_once('_').unwrap();
        let (token, ext) = rest.split_once('.').unwrap();

        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(token.len(), config::OBJECT_NAME_TOKEN_LEN);
        assert!(token.bytes().all(|b| BASE36.contains(&b)));
        assert_eq!(ext, "PDF");
    }

    #[test]
    fn test_object_name_without_extension() {
        let name = generate_object_name("README");
        assert!(!name.contains('.'));
        assert!(!generate_object_name(".hidden").contains('.'));
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("a.pdf"), "application/pdf");
        assert_eq!(guess_mime_type("photo.JPG"), "image/jpeg");
        assert_eq!(guess_mime_type("scan.png"), "image/png");
        assert_eq!(guess_mime_type("notes"), "application/octet-stream");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_file_name("a\\b\0c.pdf"), "abc.pdf");
        assert_eq!(sanitize_file_name(&"x".repeat(300)).len(), 255);
    }

    #[test]
    fn test_validate_material() {
        let png = LocalFile::new("a.png", "image/png", vec![1]);

        assert_eq!(
            validate_material(Grade::Tenth, "Math", FileType::Image, &png).unwrap(),
            "Math"
        );

        let err = validate_material(Grade::Tenth, "Math", FileType::Pdf, &png).unwrap_err();
        assert_eq!(err.to_string(), "Please select a PDF file");

        let err = validate_material(Grade::Tenth, "Math", FileType::Image, &pdf()).unwrap_err();
        assert_eq!(err.to_string(), "Please select an image file");

        assert!(validate_material(Grade::Eleventh, "Philosophy", FileType::Pdf, &pdf()).is_err());
    }

    #[tokio::test]
    async fn test_upload_stores_object_and_row() {
        let (uploader, _temp) = create_test_uploader().await;

        let material = uploader
            .upload(&teacher(), Grade::Eleventh, "History & Geography", FileType::Pdf, &pdf())
            .await
            .unwrap();

        assert_eq!(material.grade, Grade::Eleventh);
        assert_eq!(material.subject, "History & Geography");
        assert_eq!(material.file_name, "Chapter 1.pdf");
        assert_eq!(material.file_type, FileType::Pdf);
        assert_eq!(material.uploaded_by, "teacher");
        assert!(material.file_url.contains("/materials/11th/History & Geography/"));

        let objects = uploader.gateway().objects();
        let name = material.file_url.rsplit('/').next().unwrap();
        let stored = objects
            .read("materials", &material_object_path(Grade::Eleventh, "History & Geography", name))
            .await
            .unwrap();
        assert_eq!(stored, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_upload_rejects_mismatch_before_storing() {
        let (uploader, _temp) = create_test_uploader().await;
        let png = LocalFile::new("a.png", "image/png", vec![1]);

        let err = uploader
            .upload(&teacher(), Grade::Tenth, "Math", FileType::Pdf, &png)
            .await
            .unwrap_err();

        assert!(err.is_validation());
        let count = uploader
            .gateway()
            .repository()
            .count_rows(crate::gateway::Table::Materials)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_modal_flow() {
        let (uploader, _temp) = create_test_uploader().await;
        let modal = UploadModal::new(uploader, Duration::from_millis(10));
        let staff = teacher();

        modal.open(Grade::Tenth, "Math").unwrap();
        assert_eq!(modal.phase(), UploadPhase::Open);

        let err = modal.submit(&staff, |_| {}).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select a file");
        assert_eq!(modal.form_state().error.as_deref(), Some("Please select a file"));

        let png = LocalFile::new("a.png", "image/png", vec![1]);
        assert!(modal.select_file(png.clone()).is_err());
        assert!(modal.form_state().file.is_none());
        assert_eq!(
            modal.form_state().error.as_deref(),
            Some("Please select a PDF file")
        );

        modal.set_file_type(FileType::Image);
        assert!(modal.form_state().error.is_none());
        modal.select_file(png).unwrap();

        modal.set_file_type(FileType::Pdf);
        assert!(modal.form_state().file.is_none());
        modal.select_file(pdf()).unwrap();

        let fired = AtomicBool::new(false);
        let mut phases = modal.subscribe();
        let (material, seen) = tokio::join!(
            modal.submit(&staff, |m| {
                assert_eq!(m.file_type, FileType::Pdf);
                fired.store(true, Ordering::SeqCst);
            }),
            async {
                phases
                    .wait_for(|p| *p == UploadPhase::Succeeded)
                    .await
                    .map(|p| *p)
            }
        );
        let material = material.unwrap();

        assert_eq!(seen.unwrap(), UploadPhase::Succeeded);
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(material.subject, "Math");
        assert_eq!(modal.phase(), UploadPhase::Closed);
        assert_eq!(modal.form_state(), UploadForm::default());
    }

    #[tokio::test]
    async fn test_second_submit_refused_while_uploading() {
        let (uploader, _temp) = create_test_uploader().await;
        let modal = UploadModal::new(uploader, Duration::ZERO);
        let staff = teacher();

        modal.open(Grade::Tenth, "Math").unwrap();
        modal.select_file(pdf()).unwrap();

        let (first, second) = tokio::join!(
            modal.submit(&staff, |_| {}),
            modal.submit(&staff, |_| {})
        );

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err().to_string(), "Upload dialog is not open");

        let count = modal
            .uploader
            .gateway()
            .repository()
            .count_rows(crate::gateway::Table::Materials)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_close_resets_form() {
        let (uploader, _temp) = create_test_uploader().await;
        let modal = UploadModal::new(uploader, Duration::ZERO);

        modal.open(Grade::Twelfth, "Philosophy").unwrap();
        modal.set_file_type(FileType::Image);

        assert!(modal.close());
        assert_eq!(modal.phase(), UploadPhase::Closed);
        assert_eq!(modal.form_state().file_type, FileType::Pdf);
    }
}
