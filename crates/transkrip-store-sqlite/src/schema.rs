//! SQL schema for the transkrip warehouse.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Dimensions ──────────────────────────────────────────────────────────────
-- Rows are created on first sighting and never deleted.

CREATE TABLE IF NOT EXISTS Student (
    student_id          INTEGER PRIMARY KEY,
    nrp                 TEXT NOT NULL UNIQUE,   -- exact digit string
    name                TEXT NOT NULL,
    status              TEXT,
    cumulative_gpa      REAL NOT NULL,
    credits_taken       INTEGER NOT NULL,
    credits_passed      INTEGER NOT NULL,
    preparatory_gpa     REAL NOT NULL,
    preparatory_credits INTEGER NOT NULL,
    degree_gpa          REAL NOT NULL,
    degree_credits      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS Course (
    course_id INTEGER PRIMARY KEY,
    code      TEXT NOT NULL UNIQUE,
    name      TEXT NOT NULL,
    credits   INTEGER NOT NULL,
    stage     TEXT CHECK (stage IN ('preparatory', 'degree'))
);

CREATE TABLE IF NOT EXISTS Grade (
    grade_id INTEGER PRIMARY KEY,
    letter   TEXT NOT NULL UNIQUE,
    weight   REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS TimePeriod (
    time_id INTEGER PRIMARY KEY,
    year    INTEGER NOT NULL,
    term    TEXT NOT NULL CHECK (term IN ('gasal', 'genap')),
    UNIQUE (year, term)
);

-- ── Facts ───────────────────────────────────────────────────────────────────
-- Replaced per student on every ingestion of that student's transcript.

CREATE TABLE IF NOT EXISTS TranscriptEntry (
    entry_id              INTEGER PRIMARY KEY,
    student_id            INTEGER NOT NULL REFERENCES Student(student_id),
    course_id             INTEGER NOT NULL REFERENCES Course(course_id),
    grade_id              INTEGER NOT NULL REFERENCES Grade(grade_id),
    time_id               INTEGER NOT NULL REFERENCES TimePeriod(time_id),
    credits               INTEGER NOT NULL,
    weighted_contribution REAL NOT NULL,
    UNIQUE (student_id, course_id, time_id)
);

CREATE TABLE IF NOT EXISTS SemesterSummary (
    student_id     INTEGER NOT NULL REFERENCES Student(student_id),
    time_id        INTEGER NOT NULL REFERENCES TimePeriod(time_id),
    credits_taken  INTEGER NOT NULL,
    semester_gpa   REAL NOT NULL,
    cumulative_gpa REAL NOT NULL,
    PRIMARY KEY (student_id, time_id)
);

-- ── Audit ───────────────────────────────────────────────────────────────────
-- Append-only; one row per successfully loaded file.

CREATE TABLE IF NOT EXISTS IngestionLog (
    log_id         INTEGER PRIMARY KEY,
    run_id         TEXT NOT NULL,      -- hyphenated UUID of the batch run
    source_file    TEXT NOT NULL,
    nrp            TEXT NOT NULL,
    ingested_at    TEXT NOT NULL,      -- RFC 3339 UTC
    entries_loaded INTEGER NOT NULL,
    warnings       TEXT NOT NULL DEFAULT '[]'   -- JSON array of diagnostics
);

CREATE INDEX IF NOT EXISTS entry_student_idx ON TranscriptEntry(student_id);
CREATE INDEX IF NOT EXISTS log_run_idx       ON IngestionLog(run_id);

PRAGMA user_version = 1;
";
