//! `login_attempts` queries backing the vault unlock cooldown (spec §4.1,
//! §6: `recordFailedLoginAttempt`/`checkLoginCooldown`). A single row
//! (id = 1), following the teacher's singleton `pik` table pattern.

use rusqlite::Connection;

use crate::Result;

/// Current cooldown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginAttemptState {
    pub failed_count: u32,
    pub last_attempt_at: u64,
    pub cooldown_until: u64,
}

/// Read the current state.
pub fn get(conn: &Connection) -> Result<LoginAttemptState> {
    conn.query_row(
        "SELECT failed_count, last_attempt_at, cooldown_until FROM login_attempts WHERE id = 1",
        [],
        |row| {
            Ok(LoginAttemptState {
                failed_count: row.get::<_, i64>(0)? as u32,
                last_attempt_at: row.get::<_, i64>(1)? as u64,
                cooldown_until: row.get::<_, i64>(2)? as u64,
            })
        },
    )
    .map_err(Into::into)
}

/// Record a failed unlock attempt, bumping the counter. The caller is
/// responsible for computing and setting the cooldown once the configured
/// threshold is crossed, via [`set_cooldown`].
pub fn record_failed_attempt(conn: &Connection, now: u64) -> Result<u32> {
    conn.execute(
        "UPDATE login_attempts SET failed_count = failed_count + 1, last_attempt_at = ?1 WHERE id = 1",
        [now as i64],
    )?;
    Ok(get(conn)?.failed_count)
}

/// Set (or extend) the cooldown deadline.
pub fn set_cooldown(conn: &Connection, cooldown_until: u64) -> Result<()> {
    conn.execute(
        "UPDATE login_attempts SET cooldown_until = ?1 WHERE id = 1",
        [cooldown_until as i64],
    )?;
    Ok(())
}

/// Clear the failed-attempt counter and cooldown after a successful unlock.
pub fn clear(conn: &Connection) -> Result<()> {
    conn.execute(
        "UPDATE login_attempts SET failed_count = 0, cooldown_until = 0 WHERE id = 1",
        [],
    )?;
    Ok(())
}
