//! Declarator parsing - from C-family declaration text to a `Type`
//!
//! Whitespace and qualifier placement never influence the result:
//! `char * const p`, `char* p` and `char *p` all produce a pointer to `char`
//! named `p`.

use super::{ObjectType, PointerOrigin, Type};
use crate::name::Name;
use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"::|\.\.\.|[A-Za-z_][A-Za-z0-9_]*|[0-9]+|[*&\[\]<>(),.]")
        .unwrap_or_else(|e| panic!("invalid declarator token pattern: {}", e))
});

/// Qualifiers and storage classes that do not change the structural type
const IGNORED: &[&str] = &[
    "const", "volatile", "static", "extern", "register", "mutable", "inline", "restrict",
    "typename", "struct", "class", "union", "enum", "final", "auto",
];

/// Words that make up built-in primitive names
const PRIMITIVE_WORDS: &[&str] = &[
    "signed", "unsigned", "short", "long", "int", "char", "float", "double", "bool", "_Bool",
    "void", "boolean", "byte", "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32",
    "uint64", "float32", "float64",
];

/// A parsed declaration: its type and, if present, the declared name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarator {
    pub ty: Type,
    pub name: Option<String>,
    /// `...` (C varargs)
    pub variadic: bool,
}

/// Parses declarator text for one language's name delimiter.
#[derive(Debug, Clone)]
pub struct TypeParser {
    delimiter: String,
}

impl Default for TypeParser {
    fn default() -> Self {
        Self::new("::")
    }
}

impl TypeParser {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self { delimiter: delimiter.into() }
    }

    /// Parse a full declaration such as `unsigned long *values[4]`
    pub fn parse_declaration(&self, text: &str) -> Result<Declarator> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(Error::TypeParse(format!("empty declaration: {:?}", text)));
        }
        let mut cursor = Cursor { tokens: &tokens, pos: 0 };

        if cursor.peek() == Some("...") {
            cursor.next();
            let name = cursor.next().map(str::to_string);
            return Ok(Declarator { ty: Type::Unknown, name, variadic: true });
        }

        let base = self.parse_base(&mut cursor)?;
        let declarator = self.parse_declarator(&mut cursor, base)?;
        if let Some(rest) = cursor.peek() {
            return Err(Error::TypeParse(format!("unexpected {:?} in {:?}", rest, text)));
        }
        Ok(declarator)
    }

    /// Parse a type without a declared name, e.g. `std::map<int, char*>`
    pub fn parse_type(&self, text: &str) -> Result<Type> {
        self.parse_declaration(text).map(|d| d.ty)
    }

    fn parse_base(&self, cursor: &mut Cursor<'_>) -> Result<Type> {
        skip_ignored(cursor);

        let mut words = Vec::new();
        while let Some(token) = cursor.peek() {
            if PRIMITIVE_WORDS.contains(&token) {
                words.push(token);
                cursor.next();
            } else if IGNORED.contains(&token) {
                cursor.next();
            } else {
                break;
            }
        }
        if !words.is_empty() {
            return primitive_from_words(&words);
        }

        let mut segments = Vec::new();
        loop {
            match cursor.next() {
                Some(ident) if is_identifier(ident) => segments.push(ident.to_string()),
                other => {
                    return Err(Error::TypeParse(format!("expected type name, found {:?}", other)));
                }
            }
            match cursor.peek() {
                Some(sep) if sep == self.delimiter || sep == "::" || sep == "." => {
                    cursor.next();
                }
                _ => break,
            }
        }
        let mut object = ObjectType::new(Name::from_segments(segments, self.delimiter.clone()));

        if cursor.peek() == Some("<") {
            cursor.next();
            let mut generics = Vec::new();
            while cursor.peek() != Some(">") {
                let base = self.parse_base(cursor)?;
                let argument = self.parse_declarator(cursor, base)?;
                generics.push(argument.ty);
                match cursor.next() {
                    Some(",") => continue,
                    Some(">") => break,
                    other => {
                        return Err(Error::TypeParse(format!("unterminated generic list at {:?}", other)));
                    }
                }
            }
            if cursor.peek() == Some(">") && generics.is_empty() {
                cursor.next();
            }
            object.generics = generics;
        }
        skip_ignored(cursor);
        Ok(Type::Object(object))
    }

    fn parse_declarator(&self, cursor: &mut Cursor<'_>, base: Type) -> Result<Declarator> {
        let mut ty = base;
        let mut name = None;

        loop {
            match cursor.peek() {
                Some("*") => {
                    cursor.next();
                    ty = ty.reference(PointerOrigin::Pointer);
                }
                Some("&") => {
                    cursor.next();
                    // `&&` is still a single reference level
                    if cursor.peek() == Some("&") {
                        cursor.next();
                    }
                    ty = Type::Reference { element: Box::new(ty) };
                }
                Some(token) if IGNORED.contains(&token) => {
                    cursor.next();
                }
                _ => break,
            }
        }

        // Java-style arrays precede the name
        ty = parse_array_suffix(cursor, ty);

        match cursor.peek() {
            Some("(") => {
                cursor.next();
                if cursor.next() != Some("*") {
                    return Err(Error::TypeParse("expected '*' in function pointer declarator".into()));
                }
                if let Some(ident) = cursor.peek().filter(|t| is_identifier(t)) {
                    name = Some(ident.to_string());
                    cursor.next();
                }
                expect(cursor, ")")?;
                expect(cursor, "(")?;
                let parameters = self.parse_parameter_list(cursor)?;
                ty = Type::function_pointer(parameters, ty);
            }
            Some(ident) if is_identifier(ident) => {
                name = Some(ident.to_string());
                cursor.next();
            }
            _ => {}
        }

        ty = parse_array_suffix(cursor, ty);
        Ok(Declarator { ty, name, variadic: false })
    }

    fn parse_parameter_list(&self, cursor: &mut Cursor<'_>) -> Result<Vec<Type>> {
        let mut parameters = Vec::new();
        if cursor.peek() == Some(")") {
            cursor.next();
            return Ok(parameters);
        }
        loop {
            if cursor.peek() == Some("...") {
                cursor.next();
                parameters.push(Type::Unknown);
            } else {
                let base = self.parse_base(cursor)?;
                let param = self.parse_declarator(cursor, base)?;
                parameters.push(param.ty);
            }
            match cursor.next() {
                Some(",") => continue,
                Some(")") => break,
                other => return Err(Error::TypeParse(format!("unterminated parameter list at {:?}", other))),
            }
        }
        // `(void)` declares no parameters
        if parameters == [Type::Incomplete] {
            parameters.clear();
        }
        Ok(parameters)
    }
}

struct Cursor<'a> {
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

fn is_identifier(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

fn skip_ignored(cursor: &mut Cursor<'_>) {
    while cursor.peek().is_some_and(|t| IGNORED.contains(&t)) {
        cursor.next();
    }
}

fn expect(cursor: &mut Cursor<'_>, token: &str) -> Result<()> {
    match cursor.next() {
        Some(t) if t == token => Ok(()),
        other => Err(Error::TypeParse(format!("expected {:?}, found {:?}", token, other))),
    }
}

fn parse_array_suffix(cursor: &mut Cursor<'_>, mut ty: Type) -> Type {
    while cursor.peek() == Some("[") {
        cursor.next();
        while let Some(token) = cursor.next() {
            if token == "]" {
                break;
            }
        }
        ty = ty.reference(PointerOrigin::Array);
    }
    ty
}

/// Canonicalize a run of primitive words (`unsigned long int` → `unsigned long`)
fn primitive_from_words(words: &[&str]) -> Result<Type> {
    let count = |w: &str| words.iter().filter(|x| **x == w).count();
    if words.len() == 1 {
        match words[0] {
            "void" => return Ok(Type::Incomplete),
            "_Bool" => return Type::primitive("bool").ok_or_else(|| unknown(words)),
            "signed" => return Type::primitive("int").ok_or_else(|| unknown(words)),
            "unsigned" => return Type::primitive("unsigned int").ok_or_else(|| unknown(words)),
            word => return Type::primitive(word).ok_or_else(|| unknown(words)),
        }
    }

    let unsigned = count("unsigned") > 0;
    let base = if count("char") > 0 {
        if unsigned {
            "unsigned char"
        } else if count("signed") > 0 {
            "signed char"
        } else {
            "char"
        }
    } else if count("double") > 0 {
        if count("long") > 0 { "long double" } else { "double" }
    } else if count("short") > 0 {
        if unsigned { "unsigned short" } else { "short" }
    } else if count("long") >= 2 {
        if unsigned { "unsigned long long" } else { "long long" }
    } else if count("long") == 1 {
        if unsigned { "unsigned long" } else { "long" }
    } else if unsigned {
        "unsigned int"
    } else {
        "int"
    };
    Type::primitive(base).ok_or_else(|| unknown(words))
}

fn unknown(words: &[&str]) -> Error {
    Error::TypeParse(format!("unknown primitive type {:?}", words.join(" ")))
}
