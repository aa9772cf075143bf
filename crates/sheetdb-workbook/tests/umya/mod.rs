// Integration tests for the umya backend; run with `--features umya`.
mod read;
mod save;
