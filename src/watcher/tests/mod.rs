// Tests for the match state engine and watcher service
