use courier_types::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id                 TEXT PRIMARY KEY,
            sender_id          TEXT NOT NULL REFERENCES users(id),
            receiver_id        TEXT NOT NULL REFERENCES users(id),
            content            TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            is_read            INTEGER NOT NULL DEFAULT 0,
            edited             INTEGER NOT NULL DEFAULT 0,
            -- Replies to a deleted parent survive as unreachable roots.
            parent_message_id  TEXT REFERENCES messages(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_receiver
            ON messages(receiver_id, is_read);
        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender_id);
        CREATE INDEX IF NOT EXISTS idx_messages_parent
            ON messages(parent_message_id);

        -- Dependents fall with their message when a cascade deletes it.
        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id);

        CREATE TABLE IF NOT EXISTS message_history (
            id           TEXT PRIMARY KEY,
            message_id   TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            old_content  TEXT NOT NULL,
            edited_at    TEXT NOT NULL,
            editor_id    TEXT NOT NULL REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_history_message
            ON message_history(message_id);
        CREATE INDEX IF NOT EXISTS idx_history_editor
            ON message_history(editor_id);

        CREATE TABLE IF NOT EXISTS deletion_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL,
            deleted_at  TEXT NOT NULL
        );
        ",
    )
    .map_err(crate::map_sqlite_err)?;

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
    }
}
