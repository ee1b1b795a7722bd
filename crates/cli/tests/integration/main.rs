mod import_tests;
