//! Database schema and migrations.
//!
//! Migrations are applied in order when the database is opened. The
//! schema_version table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: credential store
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- Argon2 PHC string, salt included
    role        TEXT NOT NULL DEFAULT 'user',  -- 'admin', 'user'
    verified    INTEGER NOT NULL DEFAULT 0,
    otp_secret  TEXT NOT NULL,           -- base32, fixed at registration
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_users_verified ON users(verified);
"#,
    // v2: uploaded files
    r#"
CREATE TABLE files (
    id          TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    locator     TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_files_owner ON files(owner_id);
"#,
    // v3: shares, their files and their access lists
    r#"
CREATE TABLE shares (
    id          TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    is_public   INTEGER NOT NULL DEFAULT 0,
    link        TEXT NOT NULL UNIQUE,
    valid_until TEXT,
    created_at  TEXT NOT NULL,
    UNIQUE (owner_id, name),
    CHECK (is_public = 0 OR valid_until IS NOT NULL)
);

CREATE INDEX idx_shares_owner ON shares(owner_id);

CREATE TABLE share_files (
    share_id    TEXT NOT NULL REFERENCES shares(id) ON DELETE CASCADE,
    file_id     TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    PRIMARY KEY (share_id, file_id)
);

CREATE INDEX idx_share_files_file ON share_files(file_id);

CREATE TABLE share_acl (
    share_id    TEXT NOT NULL REFERENCES shares(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    granted_at  TEXT NOT NULL,
    PRIMARY KEY (share_id, user_id)
);

CREATE INDEX idx_share_acl_user ON share_acl(user_id);
"#,
];
