use crate::types::ScanRequest;

/// Build the argument vector for the scanner, program name first.
///
/// Flags are appended in a fixed order and only for fields that carry a value:
/// - `-u <url>`
/// - `-f <textFile>`
/// - `-w <wordlist>`
/// - `-m <method>`
/// - `--ratelimit <n>`
/// - `-c <n>`
///
/// Values are passed through untouched; nothing here goes through a shell.
pub fn build_args(program: &str, req: &ScanRequest) -> Vec<String> {
    let mut argv = vec![program.to_string()];

    let mut push = |flag: &str, value: Option<String>| {
        if let Some(v) = value {
            argv.push(flag.to_string());
            argv.push(v);
        }
    };

    push("-u", req.target().map(str::to_string));
    push("-f", req.target_list_file().map(str::to_string));
    push("-w", req.wordlist_file().map(str::to_string));
    push("-m", req.method().map(str::to_string));
    push("--ratelimit", req.rate_limit.map(|n| n.to_string()));
    push("-c", req.chunk_size.map(|n| n.to_string()));

    argv
}
