//! Roster domain logic: NBA composite keys and in-memory filtering.
//!
//! The NBA is the three-part identifier naming a member record:
//! two-digit graduation-year suffix, two-digit role code, and the
//! school-issued student number, joined by dots (`26.01.240917`).

use crate::models::Member;

/// Separator between the three NBA segments.
pub const NBA_SEPARATOR: char = '.';

/// Sentinel category meaning "no role filter".
pub const JABATAN_ALL: &str = "All";

/// Fixed role-code enumeration. The two-digit code is the middle NBA segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCode {
    Ketua,
    Wakil,
    Sekretaris,
    Bendahara,
    Sekbid,
    Anggota,
}

impl RoleCode {
    pub const ALL: [RoleCode; 6] = [
        RoleCode::Ketua,
        RoleCode::Wakil,
        RoleCode::Sekretaris,
        RoleCode::Bendahara,
        RoleCode::Sekbid,
        RoleCode::Anggota,
    ];

    /// The two-digit wire code.
    pub fn code(&self) -> &'static str {
        match self {
            RoleCode::Ketua => "01",
            RoleCode::Wakil => "02",
            RoleCode::Sekretaris => "03",
            RoleCode::Bendahara => "04",
            RoleCode::Sekbid => "05",
            RoleCode::Anggota => "06",
        }
    }

    /// Human-readable label shown in the admin form.
    pub fn label(&self) -> &'static str {
        match self {
            RoleCode::Ketua => "Ketua",
            RoleCode::Wakil => "Wakil",
            RoleCode::Sekretaris => "Sekretaris",
            RoleCode::Bendahara => "Bendahara",
            RoleCode::Sekbid => "Sekbid",
            RoleCode::Anggota => "Anggota",
        }
    }

    pub fn from_code(code: &str) -> Option<RoleCode> {
        RoleCode::ALL.iter().copied().find(|r| r.code() == code)
    }
}

/// Derive the NBA from its three constituent fields.
///
/// Pure string template, never fails; callers validate the inputs. The key
/// is rederived on every save so the three fields always determine it.
pub fn generate_nba(tahun_lulus: &str, kode_jabatan: &str, nis: &str) -> String {
    format!("{tahun_lulus}{NBA_SEPARATOR}{kode_jabatan}{NBA_SEPARATOR}{nis}")
}

/// Validate the constituent fields of an NBA before a save.
///
/// Year and role code must be exactly two ASCII digits, the role code must
/// come from the fixed enumeration, and the student number must be a
/// non-empty digit string (a key with an empty trailing segment is never
/// accepted by the save operation).
pub fn validate_nba_fields(
    tahun_lulus: &str,
    kode_jabatan: &str,
    nis: &str,
) -> Result<(), String> {
    if tahun_lulus.len() != 2 || !tahun_lulus.bytes().all(|b| b.is_ascii_digit()) {
        return Err("tahun_lulus must be a two-digit year suffix".to_string());
    }
    if RoleCode::from_code(kode_jabatan).is_none() {
        return Err(format!(
            "kode_jabatan must be one of {:?}",
            RoleCode::ALL.map(|r| r.code())
        ));
    }
    if nis.is_empty() || !nis.bytes().all(|b| b.is_ascii_digit()) {
        return Err("nis must be a non-empty digit string".to_string());
    }
    Ok(())
}

/// Filter the in-memory roster by free-text query and role category.
///
/// A record passes the text filter when the query is a case-insensitive
/// substring of the name or class label, or a case-sensitive substring of
/// the raw NBA. A record passes the category filter when the selected token
/// is a substring of the display role title, or the token is [`JABATAN_ALL`].
/// Both predicates are ANDed; the relative order of the input is preserved.
///
/// Runs synchronously over the complete list on every call. Fine at roster
/// scale (tens of records); there is no index and no debouncing.
pub fn filter_members(members: &[Member], query: &str, jabatan: &str) -> Vec<Member> {
    let query_lower = query.to_lowercase();

    members
        .iter()
        .filter(|m| {
            query.is_empty()
                || m.nama.to_lowercase().contains(&query_lower)
                || m.kelas.to_lowercase().contains(&query_lower)
                || m.nba.contains(query)
        })
        .filter(|m| jabatan == JABATAN_ALL || m.nama_jabatan.contains(jabatan))
        .cloned()
        .collect()
}
