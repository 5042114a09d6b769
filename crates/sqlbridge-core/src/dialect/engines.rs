//! The engine lookup table.
//!
//! Entries are ordered like the [`Engine`] variants; adding an engine means
//! adding a variant and a row here.

use super::{ConstraintSignature, DateLiteral, DialectProfile, Engine, RowLimit};

const fn sig(sql_state: Option<&'static str>, vendor_code: Option<i64>) -> ConstraintSignature {
    ConstraintSignature {
        sql_state,
        vendor_code,
    }
}

const SQLSERVER_DUPLICATE: &[ConstraintSignature] = &[
    // PRIMARY KEY violation, then unique index violation
    sig(Some("23000"), Some(2627)),
    sig(Some("23000"), Some(2601)),
];

static PROFILES: [DialectProfile; 9] = [
    DialectProfile {
        engine: Engine::Access,
        left_escape: "[",
        right_escape: "]",
        string_delimiter: '\'',
        statement_terminator: ";",
        row_limit: RowLimit::Top,
        nested_joins: true,
        date_literal: DateLiteral::Hash,
        bool_literals: ("1", "0"),
        duplicate_key: &[sig(Some("23000"), Some(-1605))],
    },
    DialectProfile {
        engine: Engine::SqlServer,
        left_escape: "[",
        right_escape: "]",
        string_delimiter: '\'',
        statement_terminator: ";",
        row_limit: RowLimit::Top,
        nested_joins: false,
        date_literal: DateLiteral::Quoted,
        bool_literals: ("1", "0"),
        duplicate_key: SQLSERVER_DUPLICATE,
    },
    DialectProfile {
        engine: Engine::Sybase,
        left_escape: "[",
        right_escape: "]",
        string_delimiter: '\'',
        statement_terminator: "",
        row_limit: RowLimit::Top,
        nested_joins: false,
        date_literal: DateLiteral::Quoted,
        bool_literals: ("1", "0"),
        duplicate_key: SQLSERVER_DUPLICATE,
    },
    DialectProfile {
        engine: Engine::MySql,
        left_escape: "`",
        right_escape: "`",
        string_delimiter: '\'',
        statement_terminator: ";",
        row_limit: RowLimit::Limit,
        nested_joins: false,
        date_literal: DateLiteral::Quoted,
        bool_literals: ("TRUE", "FALSE"),
        duplicate_key: &[sig(Some("23000"), Some(1062))],
    },
    DialectProfile {
        engine: Engine::PostgreSql,
        left_escape: "\"",
        right_escape: "\"",
        string_delimiter: '\'',
        statement_terminator: ";",
        row_limit: RowLimit::Limit,
        nested_joins: false,
        date_literal: DateLiteral::Quoted,
        bool_literals: ("TRUE", "FALSE"),
        // unique_violation; PostgreSQL reports no vendor code
        duplicate_key: &[sig(Some("23505"), None)],
    },
    DialectProfile {
        engine: Engine::Oracle,
        left_escape: "\"",
        right_escape: "\"",
        string_delimiter: '\'',
        statement_terminator: ";",
        row_limit: RowLimit::RowNum,
        nested_joins: false,
        date_literal: DateLiteral::Keyword,
        bool_literals: ("1", "0"),
        // ORA-00001
        duplicate_key: &[sig(Some("23000"), Some(1))],
    },
    DialectProfile {
        engine: Engine::Db2,
        left_escape: "\"",
        right_escape: "\"",
        string_delimiter: '\'',
        statement_terminator: ";",
        row_limit: RowLimit::Unsupported,
        nested_joins: false,
        date_literal: DateLiteral::Quoted,
        bool_literals: ("1", "0"),
        duplicate_key: &[sig(Some("23505"), Some(-803))],
    },
    DialectProfile {
        engine: Engine::Sqlite,
        left_escape: "\"",
        right_escape: "\"",
        string_delimiter: '\'',
        statement_terminator: ";",
        row_limit: RowLimit::Limit,
        nested_joins: false,
        date_literal: DateLiteral::Quoted,
        bool_literals: ("1", "0"),
        // SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE
        duplicate_key: &[sig(None, Some(1555)), sig(None, Some(2067))],
    },
    DialectProfile {
        engine: Engine::Generic,
        left_escape: "",
        right_escape: "",
        string_delimiter: '\'',
        statement_terminator: ";",
        row_limit: RowLimit::Unsupported,
        nested_joins: false,
        date_literal: DateLiteral::Quoted,
        bool_literals: ("TRUE", "FALSE"),
        duplicate_key: &[],
    },
];

pub(super) fn profile(engine: Engine) -> &'static DialectProfile {
    &PROFILES[engine as usize]
}
