//! Database repository for CRUD operations.
//!
//! Every successful mutation bumps the monotonic revision counter in the
//! `meta` table; the counter is returned in every API envelope and carried
//! on change-feed events so views can discard stale responses.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Aspiration, CreateAspirationRequest, Member, Session, UpsertMemberRequest, ANONYMOUS_NAMA,
    PLACEHOLDER_KELAS,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members, newest first.
    pub async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(
            "SELECT nba, tahun_lulus, kode_jabatan, nis, nama, kelas, nama_jabatan, bio, instagram, foto_url, created_at \
             FROM members ORDER BY created_at DESC, nba"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    /// Get a member by NBA.
    pub async fn get_member(&self, nba: &str) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(
            "SELECT nba, tahun_lulus, kode_jabatan, nis, nama, kelas, nama_jabatan, bio, instagram, foto_url, created_at \
             FROM members WHERE nba = ?"
        )
        .bind(nba)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    /// Upsert a member by its derived NBA key.
    ///
    /// Inserts a new row or overwrites the existing row sharing the key;
    /// `created_at` is assigned on first insert and preserved on overwrite.
    /// Returns the stored member and whether a row already existed.
    pub async fn upsert_member(
        &self,
        nba: &str,
        request: &UpsertMemberRequest,
    ) -> Result<(Member, bool), AppError> {
        let existing = self.get_member(nba).await?;
        let created_at = existing
            .as_ref()
            .map(|m| m.created_at.clone())
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        sqlx::query(
            r#"INSERT INTO members (nba, tahun_lulus, kode_jabatan, nis, nama, kelas, nama_jabatan, bio, instagram, foto_url, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(nba) DO UPDATE SET
                   tahun_lulus = excluded.tahun_lulus,
                   kode_jabatan = excluded.kode_jabatan,
                   nis = excluded.nis,
                   nama = excluded.nama,
                   kelas = excluded.kelas,
                   nama_jabatan = excluded.nama_jabatan,
                   bio = excluded.bio,
                   instagram = excluded.instagram,
                   foto_url = excluded.foto_url"#,
        )
        .bind(nba)
        .bind(&request.tahun_lulus)
        .bind(&request.kode_jabatan)
        .bind(&request.nis)
        .bind(&request.nama)
        .bind(&request.kelas)
        .bind(&request.nama_jabatan)
        .bind(&request.bio)
        .bind(&request.instagram)
        .bind(&request.foto_url)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        let member = Member {
            nba: nba.to_string(),
            tahun_lulus: request.tahun_lulus.clone(),
            kode_jabatan: request.kode_jabatan.clone(),
            nis: request.nis.clone(),
            nama: request.nama.clone(),
            kelas: request.kelas.clone(),
            nama_jabatan: request.nama_jabatan.clone(),
            bio: request.bio.clone(),
            instagram: request.instagram.clone(),
            foto_url: request.foto_url.clone(),
            created_at,
        };

        Ok((member, existing.is_some()))
    }

    /// Delete a member by NBA. Unconditional; the stored photo is not touched.
    pub async fn delete_member(&self, nba: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM members WHERE nba = ?")
            .bind(nba)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", nba)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== ASPIRATION OPERATIONS ====================

    /// List all aspirations, newest first.
    pub async fn list_aspirations(&self) -> Result<Vec<Aspiration>, AppError> {
        let rows = sqlx::query(
            "SELECT id, nama, kelas, pesan, created_at FROM aspirations ORDER BY created_at DESC, id DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(aspiration_from_row).collect())
    }

    /// Create a new aspiration. Blank sender fields fall back to placeholders.
    pub async fn create_aspiration(
        &self,
        request: &CreateAspirationRequest,
    ) -> Result<Aspiration, AppError> {
        let nama = match request.nama.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => ANONYMOUS_NAMA.to_string(),
        };
        let kelas = match request.kelas.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => PLACEHOLDER_KELAS.to_string(),
        };
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO aspirations (nama, kelas, pesan, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&nama)
        .bind(&kelas)
        .bind(&request.pesan)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Aspiration {
            id: result.last_insert_rowid(),
            nama,
            kelas,
            pesan: request.pesan.clone(),
            created_at: now,
        })
    }

    /// Delete an aspiration by ID.
    pub async fn delete_aspiration(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM aspirations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Aspiration {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Create a new admin session with the given lifetime.
    pub async fn create_session(&self, ttl_hours: i64) -> Result<Session, AppError> {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires = now + Duration::hours(ttl_hours);

        let session = Session {
            token,
            created_at: now.to_rfc3339(),
            expires_at: expires.to_rfc3339(),
        };

        sqlx::query("INSERT INTO sessions (token, created_at, expires_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(&session.created_at)
            .bind(&session.expires_at)
            .execute(&self.pool)
            .await?;

        Ok(session)
    }

    /// Look up a session by token. Expired sessions are removed and treated
    /// as absent.
    pub async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query("SELECT token, created_at, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let session = Session {
            token: row.get("token"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        };

        let expired = DateTime::parse_from_rfc3339(&session.expires_at)
            .map(|t| t < Utc::now())
            .unwrap_or(true);

        if expired {
            self.delete_session(&session.token).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Delete a session by token (sign-out). Deleting an unknown token is
    /// not an error.
    pub async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// Helper functions for row conversion

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    Member {
        nba: row.get("nba"),
        tahun_lulus: row.get("tahun_lulus"),
        kode_jabatan: row.get("kode_jabatan"),
        nis: row.get("nis"),
        nama: row.get("nama"),
        kelas: row.get("kelas"),
        nama_jabatan: row.get("nama_jabatan"),
        bio: row.get("bio"),
        instagram: row.get("instagram"),
        foto_url: row.get("foto_url"),
        created_at: row.get("created_at"),
    }
}

fn aspiration_from_row(row: &sqlx::sqlite::SqliteRow) -> Aspiration {
    Aspiration {
        id: row.get("id"),
        nama: row.get("nama"),
        kelas: row.get("kelas"),
        pesan: row.get("pesan"),
        created_at: row.get("created_at"),
    }
}
