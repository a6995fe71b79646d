//! Built-in completion data for Crystal.
//!
//! Keyword and type tables plus curated method sets for the common
//! standard-library receivers. These back completion and hover when the
//! workspace index has nothing better.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Crystal keywords offered in bare completions.
pub const KEYWORDS: &[&str] = &[
    "abstract",
    "alias",
    "annotation",
    "as",
    "asm",
    "begin",
    "break",
    "case",
    "class",
    "def",
    "do",
    "else",
    "elsif",
    "end",
    "ensure",
    "enum",
    "extend",
    "false",
    "for",
    "fun",
    "if",
    "in",
    "include",
    "instance_sizeof",
    "is_a?",
    "lib",
    "macro",
    "module",
    "next",
    "nil",
    "nil?",
    "of",
    "out",
    "pointerof",
    "private",
    "protected",
    "require",
    "rescue",
    "responds_to?",
    "return",
    "select",
    "self",
    "sizeof",
    "struct",
    "super",
    "then",
    "true",
    "type",
    "typeof",
    "uninitialized",
    "union",
    "unless",
    "until",
    "verbatim",
    "when",
    "while",
    "with",
    "yield",
];

/// Built-in type names offered in bare and `::` completions.
pub const BUILTIN_TYPES: &[&str] = &[
    "Array",
    "Bool",
    "Bytes",
    "Channel",
    "Char",
    "Deque",
    "Dir",
    "Exception",
    "Fiber",
    "File",
    "Float32",
    "Float64",
    "Hash",
    "IO",
    "Int128",
    "Int16",
    "Int32",
    "Int64",
    "Int8",
    "JSON",
    "Math",
    "Mutex",
    "NamedTuple",
    "Nil",
    "Number",
    "Object",
    "Path",
    "Pointer",
    "Proc",
    "Process",
    "Random",
    "Range",
    "Reference",
    "Regex",
    "Set",
    "Slice",
    "StaticArray",
    "String",
    "StringBuilder",
    "Struct",
    "Symbol",
    "Time",
    "Tuple",
    "UInt128",
    "UInt16",
    "UInt32",
    "UInt64",
    "UInt8",
    "Value",
    "YAML",
];

/// A curated method entry for a built-in receiver type.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinMethod {
    /// The method name
    pub name: &'static str,
    /// Display signature, e.g. `size : Int32`
    pub signature: &'static str,
    /// One-line description
    pub description: &'static str,
}

impl BuiltinMethod {
    /// Render hover markdown for this method on the given receiver.
    pub fn hover_content(&self, receiver: &str) -> String {
        format!(
            "```crystal\n{}#{}\n```\n\n{}",
            receiver, self.signature, self.description
        )
    }
}

/// Methods available on every object, appended to receiver completions.
pub const COMMON_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod {
        name: "class",
        signature: "class : Class",
        description: "Returns the runtime class of the receiver.",
    },
    BuiltinMethod {
        name: "dup",
        signature: "dup : self",
        description: "Returns a shallow copy.",
    },
    BuiltinMethod {
        name: "hash",
        signature: "hash : UInt64",
        description: "Returns the hash value.",
    },
    BuiltinMethod {
        name: "inspect",
        signature: "inspect : String",
        description: "Returns an unambiguous string representation.",
    },
    BuiltinMethod {
        name: "is_a?",
        signature: "is_a?(type) : Bool",
        description: "Whether the receiver is of the given type.",
    },
    BuiltinMethod {
        name: "nil?",
        signature: "nil? : Bool",
        description: "Whether the receiver is nil.",
    },
    BuiltinMethod {
        name: "not_nil!",
        signature: "not_nil! : self",
        description: "Asserts the receiver is not nil, raising otherwise.",
    },
    BuiltinMethod {
        name: "responds_to?",
        signature: "responds_to?(name) : Bool",
        description: "Whether the receiver answers the given method.",
    },
    BuiltinMethod {
        name: "tap",
        signature: "tap(&block) : self",
        description: "Yields the receiver to the block and returns it.",
    },
    BuiltinMethod {
        name: "to_s",
        signature: "to_s : String",
        description: "Returns a string representation.",
    },
    BuiltinMethod {
        name: "try",
        signature: "try(&block)",
        description: "Yields the receiver unless it is nil.",
    },
];

const STRING_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "blank?", signature: "blank? : Bool", description: "Whether the string is empty or whitespace only." },
    BuiltinMethod { name: "bytesize", signature: "bytesize : Int32", description: "Number of UTF-8 bytes." },
    BuiltinMethod { name: "capitalize", signature: "capitalize : String", description: "Upcases the first character, downcases the rest." },
    BuiltinMethod { name: "chars", signature: "chars : Array(Char)", description: "The characters as an array." },
    BuiltinMethod { name: "chomp", signature: "chomp : String", description: "Removes a trailing newline." },
    BuiltinMethod { name: "downcase", signature: "downcase : String", description: "Lowercase copy." },
    BuiltinMethod { name: "each_char", signature: "each_char(&block)", description: "Yields each character." },
    BuiltinMethod { name: "each_line", signature: "each_line(&block)", description: "Yields each line." },
    BuiltinMethod { name: "empty?", signature: "empty? : Bool", description: "Whether the string has no characters." },
    BuiltinMethod { name: "ends_with?", signature: "ends_with?(str) : Bool", description: "Whether the string ends with the given suffix." },
    BuiltinMethod { name: "gsub", signature: "gsub(pattern, replacement) : String", description: "Replaces every match of the pattern." },
    BuiltinMethod { name: "includes?", signature: "includes?(str) : Bool", description: "Whether the string contains the substring." },
    BuiltinMethod { name: "index", signature: "index(str) : Int32?", description: "Index of the first occurrence, if any." },
    BuiltinMethod { name: "lstrip", signature: "lstrip : String", description: "Removes leading whitespace." },
    BuiltinMethod { name: "match", signature: "match(regex) : Regex::MatchData?", description: "Matches against a regex." },
    BuiltinMethod { name: "rstrip", signature: "rstrip : String", description: "Removes trailing whitespace." },
    BuiltinMethod { name: "size", signature: "size : Int32", description: "Number of characters." },
    BuiltinMethod { name: "split", signature: "split(separator) : Array(String)", description: "Splits on the separator." },
    BuiltinMethod { name: "starts_with?", signature: "starts_with?(str) : Bool", description: "Whether the string starts with the given prefix." },
    BuiltinMethod { name: "strip", signature: "strip : String", description: "Removes surrounding whitespace." },
    BuiltinMethod { name: "sub", signature: "sub(pattern, replacement) : String", description: "Replaces the first match of the pattern." },
    BuiltinMethod { name: "to_f", signature: "to_f : Float64", description: "Parses as a float, raising on failure." },
    BuiltinMethod { name: "to_i", signature: "to_i : Int32", description: "Parses as an integer, raising on failure." },
    BuiltinMethod { name: "to_i?", signature: "to_i? : Int32?", description: "Parses as an integer, nil on failure." },
    BuiltinMethod { name: "upcase", signature: "upcase : String", description: "Uppercase copy." },
];

const ARRAY_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "all?", signature: "all?(&block) : Bool", description: "Whether the block is truthy for every element." },
    BuiltinMethod { name: "any?", signature: "any?(&block) : Bool", description: "Whether the block is truthy for some element." },
    BuiltinMethod { name: "clear", signature: "clear : self", description: "Removes all elements." },
    BuiltinMethod { name: "compact", signature: "compact : Array(T)", description: "Copy without nil elements." },
    BuiltinMethod { name: "each", signature: "each(&block)", description: "Yields each element." },
    BuiltinMethod { name: "each_with_index", signature: "each_with_index(&block)", description: "Yields each element with its index." },
    BuiltinMethod { name: "empty?", signature: "empty? : Bool", description: "Whether the array has no elements." },
    BuiltinMethod { name: "first", signature: "first : T", description: "The first element, raising when empty." },
    BuiltinMethod { name: "first?", signature: "first? : T?", description: "The first element, nil when empty." },
    BuiltinMethod { name: "flatten", signature: "flatten : Array", description: "Recursively flattens nested arrays." },
    BuiltinMethod { name: "includes?", signature: "includes?(value) : Bool", description: "Whether the array contains the value." },
    BuiltinMethod { name: "join", signature: "join(separator = \"\") : String", description: "Joins elements into a string." },
    BuiltinMethod { name: "last", signature: "last : T", description: "The last element, raising when empty." },
    BuiltinMethod { name: "map", signature: "map(&block) : Array(U)", description: "New array from applying the block to each element." },
    BuiltinMethod { name: "pop", signature: "pop : T", description: "Removes and returns the last element." },
    BuiltinMethod { name: "push", signature: "push(value) : self", description: "Appends a value." },
    BuiltinMethod { name: "reduce", signature: "reduce(&block)", description: "Folds elements with the block." },
    BuiltinMethod { name: "reject", signature: "reject(&block) : Array(T)", description: "Elements for which the block is falsy." },
    BuiltinMethod { name: "reverse", signature: "reverse : Array(T)", description: "Reversed copy." },
    BuiltinMethod { name: "select", signature: "select(&block) : Array(T)", description: "Elements for which the block is truthy." },
    BuiltinMethod { name: "shift", signature: "shift : T", description: "Removes and returns the first element." },
    BuiltinMethod { name: "size", signature: "size : Int32", description: "Number of elements." },
    BuiltinMethod { name: "sort", signature: "sort : Array(T)", description: "Sorted copy." },
    BuiltinMethod { name: "sort_by", signature: "sort_by(&block) : Array(T)", description: "Sorted copy keyed by the block." },
    BuiltinMethod { name: "uniq", signature: "uniq : Array(T)", description: "Copy without duplicates." },
    BuiltinMethod { name: "unshift", signature: "unshift(value) : self", description: "Prepends a value." },
];

const HASH_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "delete", signature: "delete(key) : V?", description: "Removes the key, returning its value." },
    BuiltinMethod { name: "each", signature: "each(&block)", description: "Yields each key/value pair." },
    BuiltinMethod { name: "empty?", signature: "empty? : Bool", description: "Whether the hash has no entries." },
    BuiltinMethod { name: "fetch", signature: "fetch(key, default)", description: "The value for key, or the default." },
    BuiltinMethod { name: "has_key?", signature: "has_key?(key) : Bool", description: "Whether the key is present." },
    BuiltinMethod { name: "has_value?", signature: "has_value?(value) : Bool", description: "Whether some key maps to the value." },
    BuiltinMethod { name: "keys", signature: "keys : Array(K)", description: "All keys." },
    BuiltinMethod { name: "merge", signature: "merge(other) : Hash(K, V)", description: "Copy with the other hash's entries." },
    BuiltinMethod { name: "size", signature: "size : Int32", description: "Number of entries." },
    BuiltinMethod { name: "values", signature: "values : Array(V)", description: "All values." },
];

const INT_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "abs", signature: "abs : self", description: "Absolute value." },
    BuiltinMethod { name: "clamp", signature: "clamp(min, max) : self", description: "Clamped into the given bounds." },
    BuiltinMethod { name: "downto", signature: "downto(limit, &block)", description: "Yields from self down to the limit." },
    BuiltinMethod { name: "even?", signature: "even? : Bool", description: "Whether the number is even." },
    BuiltinMethod { name: "odd?", signature: "odd? : Bool", description: "Whether the number is odd." },
    BuiltinMethod { name: "times", signature: "times(&block)", description: "Yields 0 through self - 1." },
    BuiltinMethod { name: "to_f", signature: "to_f : Float64", description: "Converts to a float." },
    BuiltinMethod { name: "to_i64", signature: "to_i64 : Int64", description: "Converts to Int64." },
    BuiltinMethod { name: "upto", signature: "upto(limit, &block)", description: "Yields from self up to the limit." },
    BuiltinMethod { name: "zero?", signature: "zero? : Bool", description: "Whether the number is zero." },
];

const FLOAT_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "abs", signature: "abs : self", description: "Absolute value." },
    BuiltinMethod { name: "ceil", signature: "ceil : self", description: "Rounds up." },
    BuiltinMethod { name: "floor", signature: "floor : self", description: "Rounds down." },
    BuiltinMethod { name: "nan?", signature: "nan? : Bool", description: "Whether the value is NaN." },
    BuiltinMethod { name: "round", signature: "round(digits = 0) : self", description: "Rounds to the given precision." },
    BuiltinMethod { name: "to_i", signature: "to_i : Int32", description: "Truncates to an integer." },
];

const BOOL_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "to_s", signature: "to_s : String", description: "\"true\" or \"false\"." },
    BuiltinMethod { name: "to_unsafe", signature: "to_unsafe : LibC::Int", description: "C-compatible representation." },
];

const RANGE_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "begin", signature: "begin : B", description: "The lower bound." },
    BuiltinMethod { name: "each", signature: "each(&block)", description: "Yields each element of the range." },
    BuiltinMethod { name: "end", signature: "end : E", description: "The upper bound." },
    BuiltinMethod { name: "includes?", signature: "includes?(value) : Bool", description: "Whether the value falls inside the range." },
    BuiltinMethod { name: "map", signature: "map(&block) : Array(U)", description: "Maps each element to a new array." },
    BuiltinMethod { name: "step", signature: "step(by, &block)", description: "Yields every by-th element." },
    BuiltinMethod { name: "sum", signature: "sum", description: "Sum of the elements." },
    BuiltinMethod { name: "to_a", signature: "to_a : Array(T)", description: "The elements as an array." },
];

const REGEX_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "match", signature: "match(str) : Regex::MatchData?", description: "Matches against a string." },
    BuiltinMethod { name: "matches?", signature: "matches?(str) : Bool", description: "Whether the regex matches the string." },
    BuiltinMethod { name: "source", signature: "source : String", description: "The regex source text." },
];

const SYMBOL_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "to_s", signature: "to_s : String", description: "The symbol's name." },
];

const CHAR_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "alphanumeric?", signature: "alphanumeric? : Bool", description: "Whether the character is a letter or digit." },
    BuiltinMethod { name: "ascii?", signature: "ascii? : Bool", description: "Whether the character is ASCII." },
    BuiltinMethod { name: "downcase", signature: "downcase : Char", description: "Lowercase counterpart." },
    BuiltinMethod { name: "ord", signature: "ord : Int32", description: "The codepoint." },
    BuiltinMethod { name: "upcase", signature: "upcase : Char", description: "Uppercase counterpart." },
];

const TIME_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "day", signature: "day : Int32", description: "Day of the month." },
    BuiltinMethod { name: "hour", signature: "hour : Int32", description: "Hour of the day." },
    BuiltinMethod { name: "month", signature: "month : Int32", description: "Month of the year." },
    BuiltinMethod { name: "to_unix", signature: "to_unix : Int64", description: "Seconds since the Unix epoch." },
    BuiltinMethod { name: "year", signature: "year : Int32", description: "The year." },
];

const FILE_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "close", signature: "close", description: "Closes the file." },
    BuiltinMethod { name: "each_line", signature: "each_line(&block)", description: "Yields each line." },
    BuiltinMethod { name: "gets_to_end", signature: "gets_to_end : String", description: "Reads the remaining content." },
    BuiltinMethod { name: "path", signature: "path : String", description: "The file's path." },
    BuiltinMethod { name: "size", signature: "size : Int64", description: "Size in bytes." },
];

const IO_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "flush", signature: "flush", description: "Flushes buffered output." },
    BuiltinMethod { name: "gets", signature: "gets : String?", description: "Reads one line." },
    BuiltinMethod { name: "print", signature: "print(*objects)", description: "Writes the objects." },
    BuiltinMethod { name: "puts", signature: "puts(*objects)", description: "Writes the objects with newlines." },
    BuiltinMethod { name: "read", signature: "read(slice) : Int32", description: "Reads into the slice." },
    BuiltinMethod { name: "write", signature: "write(slice)", description: "Writes the slice." },
];

/// Curated method sets by receiver type name.
pub static RECEIVER_METHODS: LazyLock<HashMap<&'static str, &'static [BuiltinMethod]>> =
    LazyLock::new(|| {
        let mut map: HashMap<&'static str, &'static [BuiltinMethod]> = HashMap::new();
        map.insert("String", STRING_METHODS);
        map.insert("Array", ARRAY_METHODS);
        map.insert("Hash", HASH_METHODS);
        map.insert("Int8", INT_METHODS);
        map.insert("Int16", INT_METHODS);
        map.insert("Int32", INT_METHODS);
        map.insert("Int64", INT_METHODS);
        map.insert("UInt8", INT_METHODS);
        map.insert("UInt16", INT_METHODS);
        map.insert("UInt32", INT_METHODS);
        map.insert("UInt64", INT_METHODS);
        map.insert("Float32", FLOAT_METHODS);
        map.insert("Float64", FLOAT_METHODS);
        map.insert("Bool", BOOL_METHODS);
        map.insert("Range", RANGE_METHODS);
        map.insert("Regex", REGEX_METHODS);
        map.insert("Symbol", SYMBOL_METHODS);
        map.insert("Char", CHAR_METHODS);
        map.insert("Time", TIME_METHODS);
        map.insert("File", FILE_METHODS);
        map.insert("IO", IO_METHODS);
        map
    });

/// Methods for a receiver type, honoring generic names like `Array(String)`.
pub fn methods_for_receiver(type_name: &str) -> Option<&'static [BuiltinMethod]> {
    let base = type_name.split('(').next().unwrap_or(type_name).trim();
    RECEIVER_METHODS.get(base).copied()
}
