//! SQL schema for the civic SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS departments (
    department_id TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS teams (
    team_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    department_id TEXT NOT NULL REFERENCES departments(department_id),
    status        TEXT NOT NULL    -- 'AVAILABLE' | 'BUSY' | 'INACTIVE'
);

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    display_name  TEXT NOT NULL,
    department_id TEXT REFERENCES departments(department_id),
    roles         TEXT NOT NULL DEFAULT '[]'   -- JSON array of role names
);

-- Owner and actor ids are not foreign keys: principals are authenticated
-- upstream and need not have a users row.
CREATE TABLE IF NOT EXISTS reports (
    report_id         TEXT PRIMARY KEY,
    title             TEXT NOT NULL,
    description       TEXT NOT NULL,
    category          TEXT,
    status            TEXT NOT NULL,
    sub_status        TEXT NOT NULL DEFAULT 'NONE',
    department_id     TEXT NOT NULL REFERENCES departments(department_id),
    owner_user_id     TEXT NOT NULL,
    closed_by_user_id TEXT,
    resolution_notes  TEXT,
    rejection_reason  TEXT,
    resolved_at       TEXT,
    support_count     INTEGER NOT NULL DEFAULT 0 CHECK (support_count >= 0),
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    CHECK (status = 'IN_PROGRESS' OR sub_status = 'NONE')
);

CREATE TABLE IF NOT EXISTS assignments (
    assignment_id       TEXT PRIMARY KEY,
    report_id           TEXT NOT NULL REFERENCES reports(report_id),
    assignee_type       TEXT NOT NULL,   -- 'USER' | 'TEAM'
    assignee_user_id    TEXT,
    assignee_team_id    TEXT REFERENCES teams(team_id),
    assigned_by_user_id TEXT NOT NULL,
    status              TEXT NOT NULL,   -- 'ACTIVE' | 'COMPLETED' | 'CANCELLED'
    assigned_at         TEXT NOT NULL,
    accepted_at         TEXT,
    completed_at        TEXT,
    cancelled_at        TEXT,
    notes               TEXT,
    CHECK (
        (assignee_type = 'USER' AND assignee_user_id IS NOT NULL AND assignee_team_id IS NULL)
     OR (assignee_type = 'TEAM' AND assignee_team_id IS NOT NULL AND assignee_user_id IS NULL)
    )
);

-- Backstop for the supersede-then-insert logic: at most one ACTIVE
-- assignment per report, whatever code path writes it.
CREATE UNIQUE INDEX IF NOT EXISTS assignments_one_active_idx
    ON assignments(report_id) WHERE status = 'ACTIVE';

-- Audit tables are strictly append-only.
CREATE TABLE IF NOT EXISTS report_status_history (
    history_id          TEXT PRIMARY KEY,
    report_id           TEXT NOT NULL REFERENCES reports(report_id),
    previous_status     TEXT,            -- NULL for the creation entry
    new_status          TEXT NOT NULL,
    previous_sub_status TEXT NOT NULL,
    new_sub_status      TEXT NOT NULL,
    actor_user_id       TEXT NOT NULL,
    notes               TEXT,
    recorded_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS report_department_history (
    history_id             TEXT PRIMARY KEY,
    report_id              TEXT NOT NULL REFERENCES reports(report_id),
    previous_department_id TEXT NOT NULL,
    new_department_id      TEXT NOT NULL,
    actor_user_id          TEXT NOT NULL,
    reason                 TEXT NOT NULL,
    recorded_at            TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS report_status_history_no_update
    BEFORE UPDATE ON report_status_history
    BEGIN SELECT RAISE(ABORT, 'report_status_history is append-only'); END;
CREATE TRIGGER IF NOT EXISTS report_status_history_no_delete
    BEFORE DELETE ON report_status_history
    BEGIN SELECT RAISE(ABORT, 'report_status_history is append-only'); END;
CREATE TRIGGER IF NOT EXISTS report_department_history_no_update
    BEFORE UPDATE ON report_department_history
    BEGIN SELECT RAISE(ABORT, 'report_department_history is append-only'); END;
CREATE TRIGGER IF NOT EXISTS report_department_history_no_delete
    BEFORE DELETE ON report_department_history
    BEGIN SELECT RAISE(ABORT, 'report_department_history is append-only'); END;

-- Row existence is the source of truth for reports.support_count.
CREATE TABLE IF NOT EXISTS report_supports (
    report_id  TEXT NOT NULL REFERENCES reports(report_id),
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (report_id, user_id)
);

-- Media ids are issued by the external media service.
CREATE TABLE IF NOT EXISTS report_media (
    report_id  TEXT NOT NULL REFERENCES reports(report_id),
    media_id   INTEGER NOT NULL,
    context    TEXT NOT NULL,    -- 'RESOLUTION_PROOF'
    created_at TEXT NOT NULL,
    PRIMARY KEY (report_id, media_id, context)
);

CREATE INDEX IF NOT EXISTS reports_department_idx ON reports(department_id);
CREATE INDEX IF NOT EXISTS reports_status_idx     ON reports(status);
CREATE INDEX IF NOT EXISTS assignments_report_idx ON assignments(report_id);
CREATE INDEX IF NOT EXISTS status_history_report_idx
    ON report_status_history(report_id);
CREATE INDEX IF NOT EXISTS department_history_report_idx
    ON report_department_history(report_id);

PRAGMA user_version = 1;
";
